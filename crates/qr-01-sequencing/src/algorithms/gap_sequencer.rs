//! Gap-filling sequencer.
//!
//! Turns an out-of-order, at-most-once stream of numbered items from one
//! source into a release stream in strict sequence order.
//!
//! ## Algorithm
//!
//! 1. Reject items from another source, malformed items, already released
//!    sequences and sequences already cached.
//! 2. Cache the item keyed by sequence.
//! 3. Drain: while the smallest cached item is the recorder's successor with
//!    a newer timestamp, pop it and release it.
//!
//! An item whose timestamp does not move forward is never released, and it
//! blocks every later sequence of that source.

use crate::domain::{ReorderCache, Sequenced, SequencingError, SourceRecorder};
use tracing::{debug, warn};

pub struct GapSequencer<T: Sequenced> {
    source_id: u64,
    recorder: SourceRecorder,
    cache: ReorderCache<T>,
    warn_pending: usize,
}

impl<T: Sequenced> GapSequencer<T> {
    pub fn new(source_id: u64) -> Self {
        Self::with_pending_warning(source_id, usize::MAX)
    }

    /// Like [`new`](Self::new), logging a warning whenever the cache grows
    /// past `warn_pending` items.
    pub fn with_pending_warning(source_id: u64, warn_pending: usize) -> Self {
        Self {
            source_id,
            recorder: SourceRecorder::new(),
            cache: ReorderCache::new(),
            warn_pending,
        }
    }

    pub fn source_id(&self) -> u64 {
        self.source_id
    }

    /// Accept one item and return everything it unblocked, in order.
    pub fn receive(&mut self, item: T) -> Result<Vec<T::Release>, SequencingError> {
        if item.source_id() != self.source_id {
            return Err(SequencingError::SourceMismatch {
                expected: self.source_id,
                actual: item.source_id(),
            });
        }
        item.validate()?;

        let sequence = item.sequence();
        if sequence <= self.recorder.counter() {
            return Err(SequencingError::StaleSequence {
                source_id: self.source_id,
                sequence,
                counter: self.recorder.counter(),
            });
        }
        if !self.cache.insert(sequence, item) {
            return Err(SequencingError::DuplicateSequence {
                source_id: self.source_id,
                sequence,
            });
        }
        if self.cache.len() > self.warn_pending {
            warn!(
                source = self.source_id,
                pending = self.cache.len(),
                next = self.recorder.counter() + 1,
                "[qr-01] reorder cache above threshold"
            );
        }

        Ok(self.drain())
    }

    fn drain(&mut self) -> Vec<T::Release> {
        let mut released = Vec::new();
        while let Some((sequence, item)) = self.cache.peek() {
            if !self.recorder.accepts(sequence, item.timestamp()) {
                break;
            }
            let Some((sequence, item)) = self.cache.pop() else {
                break;
            };
            self.recorder.advance(sequence, item.timestamp());
            released.extend(item.into_releases());
        }
        if !released.is_empty() {
            debug!(
                source = self.source_id,
                counter = self.recorder.counter(),
                released = released.len(),
                "[qr-01] released in order"
            );
        }
        released
    }

    /// Last released sequence.
    pub fn counter(&self) -> u64 {
        self.recorder.counter()
    }

    /// Items still waiting for a predecessor.
    pub fn pending(&self) -> usize {
        self.cache.len()
    }
}
