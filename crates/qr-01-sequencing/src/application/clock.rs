//! Strictly increasing wall-clock timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Nanosecond timestamps that never repeat or go backwards, even if the
/// system clock does.
#[derive(Debug, Default, Clone)]
pub struct MonotonicClock {
    last: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        self.last = now.max(self.last.saturating_add(1));
        self.last
    }
}
