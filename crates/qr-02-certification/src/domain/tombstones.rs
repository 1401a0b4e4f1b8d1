//! Bounded memory of hashes that left certification.
//!
//! A retired or withdrawn hash must not re-enter a stage while reports of it
//! are still in flight. A tombstone is dropped as soon as every replica has
//! reported the hash, since no further honest report can arrive, or once it
//! is `window` batches old, which bounds the set when a replica stays silent.

use shared_types::{BatchSeq, ReplicaId, TxHash};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone)]
struct Tombstone {
    batch_seq: BatchSeq,
    reporters: BTreeSet<ReplicaId>,
}

#[derive(Debug, Clone)]
pub struct Tombstones {
    replicas: usize,
    window: u64,
    entries: HashMap<TxHash, Tombstone>,
    by_batch: BTreeMap<BatchSeq, Vec<TxHash>>,
}

impl Tombstones {
    pub fn new(replicas: usize, window: u64) -> Self {
        Self {
            replicas,
            window: window.max(1),
            entries: HashMap::new(),
            by_batch: BTreeMap::new(),
        }
    }

    /// Bury `hash`, already reported by `reporters`, as of `batch_seq`.
    ///
    /// Also expires every tombstone `window` or more batches older.
    pub fn bury<I>(&mut self, batch_seq: BatchSeq, hash: TxHash, reporters: I)
    where
        I: IntoIterator<Item = ReplicaId>,
    {
        self.expire_before(batch_seq.saturating_sub(self.window - 1));

        let reporters: BTreeSet<ReplicaId> = reporters.into_iter().collect();
        if reporters.len() >= self.replicas {
            self.entries.remove(&hash);
            return;
        }
        self.by_batch.entry(batch_seq).or_default().push(hash.clone());
        self.entries.insert(
            hash,
            Tombstone {
                batch_seq,
                reporters,
            },
        );
    }

    /// Returns `true` if `hash` is buried, recording `replica` as a reporter.
    pub fn absorb(&mut self, hash: &TxHash, replica: ReplicaId) -> bool {
        let Some(tombstone) = self.entries.get_mut(hash) else {
            return false;
        };
        tombstone.reporters.insert(replica);
        if tombstone.reporters.len() >= self.replicas {
            self.entries.remove(hash);
        }
        true
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every tombstone buried before `batch_seq`.
    pub fn expire_before(&mut self, batch_seq: BatchSeq) {
        let kept = self.by_batch.split_off(&batch_seq);
        let expired = std::mem::replace(&mut self.by_batch, kept);
        for hash in expired.into_values().flatten() {
            // A hash buried twice keeps its newest tombstone.
            if self
                .entries
                .get(&hash)
                .is_some_and(|tombstone| tombstone.batch_seq < batch_seq)
            {
                self.entries.remove(&hash);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(name: &str) -> TxHash {
        TxHash::from(name)
    }

    #[test]
    fn test_dropped_once_every_replica_reported() {
        let mut tombstones = Tombstones::new(4, 64);
        tombstones.bury(1, hash("a"), [1, 2]);
        assert!(tombstones.contains(&hash("a")));

        assert!(tombstones.absorb(&hash("a"), 3));
        assert!(tombstones.absorb(&hash("a"), 3));
        assert_eq!(tombstones.len(), 1);

        // The last report is still swallowed, then the tombstone goes.
        assert!(tombstones.absorb(&hash("a"), 4));
        assert!(tombstones.is_empty());
        assert!(!tombstones.absorb(&hash("a"), 4));
    }

    #[test]
    fn test_fully_reported_hash_never_buried() {
        let mut tombstones = Tombstones::new(4, 64);
        tombstones.bury(1, hash("a"), [1, 2, 3, 4]);
        assert!(tombstones.is_empty());
    }

    #[test]
    fn test_window_bounds_silent_replica() {
        // Replica 4 never reports, so only the window can clear these.
        let mut tombstones = Tombstones::new(4, 2);
        tombstones.bury(1, hash("a"), [1, 2, 3]);
        tombstones.bury(2, hash("b"), [1, 2, 3]);
        assert_eq!(tombstones.len(), 2);

        tombstones.bury(3, hash("c"), [1, 2, 3]);
        assert!(!tombstones.contains(&hash("a")));
        assert!(tombstones.contains(&hash("b")));
        assert!(tombstones.contains(&hash("c")));
        assert_eq!(tombstones.len(), 2);
    }

    #[test]
    fn test_reburied_hash_keeps_newest() {
        let mut tombstones = Tombstones::new(4, 2);
        tombstones.bury(1, hash("a"), [1]);
        tombstones.bury(2, hash("a"), [1]);
        tombstones.expire_before(2);
        assert!(tombstones.contains(&hash("a")));
    }
}
