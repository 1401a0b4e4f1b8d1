//! Min-heap of pending items keyed by sequence.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

struct Pending<T> {
    sequence: u64,
    item: T,
}

impl<T> PartialEq for Pending<T> {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl<T> Eq for Pending<T> {}

impl<T> PartialOrd for Pending<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Pending<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

/// Items waiting for their predecessors.
///
/// The presence set mirrors the heap's keys so duplicates are rejected in
/// O(1) without scanning the heap.
pub struct ReorderCache<T> {
    heap: BinaryHeap<Reverse<Pending<T>>>,
    present: HashSet<u64>,
}

impl<T> ReorderCache<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            present: HashSet::new(),
        }
    }

    pub fn contains(&self, sequence: u64) -> bool {
        self.present.contains(&sequence)
    }

    /// Returns `false` (and drops `item`) if `sequence` is already cached.
    pub fn insert(&mut self, sequence: u64, item: T) -> bool {
        if !self.present.insert(sequence) {
            return false;
        }
        self.heap.push(Reverse(Pending { sequence, item }));
        true
    }

    /// Smallest cached sequence and its item.
    pub fn peek(&self) -> Option<(u64, &T)> {
        self.heap
            .peek()
            .map(|Reverse(pending)| (pending.sequence, &pending.item))
    }

    pub fn pop(&mut self) -> Option<(u64, T)> {
        let Reverse(pending) = self.heap.pop()?;
        self.present.remove(&pending.sequence);
        Some((pending.sequence, pending.item))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T> Default for ReorderCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
