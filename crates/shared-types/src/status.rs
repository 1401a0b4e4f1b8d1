//! # Status Flags
//!
//! Named lifecycle flags over a bitset.
//!
//! `StatusSet` is owned by a single worker and mutated through `&mut self`.
//! `AtomicStatusSet` is shared between tasks (e.g. a pipeline handle and its
//! workers) and mutated through `&self`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusFlag {
    /// Workers are spawned.
    Running,
    /// The paving liveness timer is armed.
    Paving,
    /// The gathering (verifying) liveness timer is armed.
    Gathering,
    /// The appointing (graphing) liveness timer is armed.
    Appointing,
    /// Shutdown has been requested.
    Stopping,
}

impl StatusFlag {
    const fn bit(self) -> u32 {
        match self {
            Self::Running => 1 << 0,
            Self::Paving => 1 << 1,
            Self::Gathering => 1 << 2,
            Self::Appointing => 1 << 3,
            Self::Stopping => 1 << 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSet(u32);

impl StatusSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, flag: StatusFlag) {
        self.0 |= flag.bit();
    }

    pub fn off(&mut self, flag: StatusFlag) {
        self.0 &= !flag.bit();
    }

    pub fn has(&self, flag: StatusFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn has_any(&self, flags: &[StatusFlag]) -> bool {
        flags.iter().any(|flag| self.has(*flag))
    }
}

#[derive(Debug, Default)]
pub struct AtomicStatusSet(AtomicU32);

impl AtomicStatusSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `flag`, returning `true` only if it was previously clear.
    pub fn on(&self, flag: StatusFlag) -> bool {
        self.0.fetch_or(flag.bit(), Ordering::AcqRel) & flag.bit() == 0
    }

    /// Clears `flag`, returning `true` only if it was previously set.
    pub fn off(&self, flag: StatusFlag) -> bool {
        self.0.fetch_and(!flag.bit(), Ordering::AcqRel) & flag.bit() != 0
    }

    pub fn has(&self, flag: StatusFlag) -> bool {
        self.0.load(Ordering::Acquire) & flag.bit() != 0
    }

    pub fn has_any(&self, flags: &[StatusFlag]) -> bool {
        let bits = self.0.load(Ordering::Acquire);
        flags.iter().any(|flag| bits & flag.bit() != 0)
    }

    pub fn snapshot(&self) -> StatusSet {
        StatusSet(self.0.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_set() {
        let mut status = StatusSet::new();
        assert!(!status.has(StatusFlag::Running));

        status.on(StatusFlag::Running);
        status.on(StatusFlag::Paving);
        assert!(status.has(StatusFlag::Running));
        assert!(status.has_any(&[StatusFlag::Gathering, StatusFlag::Paving]));

        status.off(StatusFlag::Paving);
        assert!(!status.has(StatusFlag::Paving));
        assert!(!status.has_any(&[StatusFlag::Gathering, StatusFlag::Paving]));
    }

    #[test]
    fn test_atomic_on_reports_transition() {
        let status = AtomicStatusSet::new();
        assert!(status.on(StatusFlag::Running));
        assert!(!status.on(StatusFlag::Running));
        assert!(status.off(StatusFlag::Running));
        assert!(!status.off(StatusFlag::Running));
    }

    #[test]
    fn test_atomic_snapshot() {
        let status = AtomicStatusSet::new();
        status.on(StatusFlag::Appointing);
        let snapshot = status.snapshot();
        assert!(snapshot.has(StatusFlag::Appointing));
        assert!(!snapshot.has(StatusFlag::Stopping));
    }
}
