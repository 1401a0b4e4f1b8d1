//! Release bookkeeping for one source.

use serde::{Deserialize, Serialize};

/// Last released sequence and timestamp of a single source.
///
/// Owned by exactly one sequencer; never shared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecorder {
    counter: u64,
    last_timestamp: u64,
}

impl SourceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An item is releasable iff it is the immediate successor and its
    /// timestamp moves strictly forward.
    pub fn accepts(&self, sequence: u64, timestamp: u64) -> bool {
        sequence == self.counter + 1 && timestamp > self.last_timestamp
    }

    pub fn advance(&mut self, sequence: u64, timestamp: u64) {
        debug_assert!(self.accepts(sequence, timestamp));
        self.counter = sequence;
        self.last_timestamp = timestamp;
    }

    /// Last released sequence (0 before the first release).
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }
}
