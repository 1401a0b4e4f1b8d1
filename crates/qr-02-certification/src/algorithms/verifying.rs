//! Verifying: quorum witness per hash, emitted in first-sighting order.

use crate::config::DEFAULT_TOMBSTONE_WINDOW;
use crate::domain::{CertificationError, Tombstones, TxWitnessRecord};
use shared_types::{FaultModel, OrderedLogEntry, RetiredBatch, TxHash};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

pub struct VerifyingState {
    model: FaultModel,
    records: HashMap<TxHash, TxWitnessRecord>,
    /// Unverified hashes in first-sighting order.
    pending: VecDeque<TxHash>,
    verified: HashSet<TxHash>,
    retired: Tombstones,
}

impl VerifyingState {
    pub fn new(model: FaultModel) -> Self {
        Self {
            model,
            records: HashMap::new(),
            pending: VecDeque::new(),
            verified: HashSet::new(),
            retired: Tombstones::new(model.n(), DEFAULT_TOMBSTONE_WINDOW),
        }
    }

    #[must_use]
    pub fn with_tombstone_window(mut self, window: u64) -> Self {
        self.retired = Tombstones::new(self.model.n(), window);
        self
    }

    /// Record the entry's witness and return every hash that became
    /// verified as a result, in FIFO order.
    pub fn on_log(&mut self, entry: &OrderedLogEntry) -> Result<Vec<TxHash>, CertificationError> {
        if !self.model.is_known(entry.replica_id) {
            return Err(CertificationError::UnknownReplica {
                replica: entry.replica_id,
                n: self.model.n(),
            });
        }
        if self.retired.absorb(&entry.tx_hash, entry.replica_id) {
            return Ok(Vec::new());
        }

        let first_sighting = !self.records.contains_key(&entry.tx_hash);
        self.records
            .entry(entry.tx_hash.clone())
            .or_default()
            .witness(entry.replica_id);
        if first_sighting && !self.verified.contains(&entry.tx_hash) {
            self.pending.push_back(entry.tx_hash.clone());
        }
        Ok(self.scan())
    }

    /// Pop and verify heads while they hold a quorum of witnesses.
    pub fn scan(&mut self) -> Vec<TxHash> {
        let quorum = self.model.quorum();
        let mut emitted = Vec::new();
        while let Some(head) = self.pending.front() {
            let witnesses = self.records.get(head).map_or(0, TxWitnessRecord::count);
            if witnesses < quorum {
                break;
            }
            if let Some(hash) = self.pending.pop_front() {
                self.verified.insert(hash.clone());
                emitted.push(hash);
            }
        }
        emitted
    }

    /// The head blocking the FIFO, with its witness count.
    pub fn stalled_head(&self) -> Option<(TxHash, usize)> {
        let head = self.pending.front()?;
        let witnesses = self.records.get(head).map_or(0, TxWitnessRecord::count);
        (witnesses < self.model.quorum()).then(|| (head.clone(), witnesses))
    }

    /// Move `hash` from the head to the back of the FIFO.
    ///
    /// Returns its witness count, or `None` if it is no longer the head.
    pub fn defer(&mut self, hash: &TxHash) -> Option<usize> {
        if self.pending.front() != Some(hash) {
            return None;
        }
        let head = self.pending.pop_front()?;
        let witnesses = self.records.get(&head).map_or(0, TxWitnessRecord::count);
        self.pending.push_back(head);
        Some(witnesses)
    }

    /// Forget `batch.members`, whether finalized or withdrawn.
    pub fn on_retired(&mut self, batch: &RetiredBatch) {
        for hash in &batch.members {
            let reporters: Vec<_> = self
                .records
                .remove(hash)
                .map(|record| record.witnesses().copied().collect())
                .unwrap_or_default();
            self.verified.remove(hash);
            self.retired.bury(batch.batch_seq, hash.clone(), reporters);
        }
        self.pending.retain(|hash| !batch.members.contains(hash));
        debug!(
            batch_seq = batch.batch_seq,
            pending = self.pending.len(),
            "[qr-02] verifying state retired batch"
        );
    }

    pub fn is_verified(&self, hash: &TxHash) -> bool {
        self.verified.contains(hash)
    }

    pub fn witnesses(&self, hash: &TxHash) -> usize {
        self.records.get(hash).map_or(0, TxWitnessRecord::count)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn tombstones(&self) -> usize {
        self.retired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn entry(replica: u64, sequence: u64, hash: &str) -> OrderedLogEntry {
        OrderedLogEntry {
            replica_id: replica,
            sequence,
            tx_hash: hash.into(),
            timestamp: sequence,
        }
    }

    fn state() -> VerifyingState {
        VerifyingState::new(FaultModel::new(4).unwrap())
    }

    #[test]
    fn test_emits_at_quorum_once() {
        let mut state = state();
        assert!(state.on_log(&entry(1, 1, "a")).unwrap().is_empty());
        assert!(state.on_log(&entry(2, 1, "a")).unwrap().is_empty());
        assert_eq!(state.on_log(&entry(3, 1, "a")).unwrap(), vec![TxHash::from("a")]);
        assert!(state.on_log(&entry(4, 1, "a")).unwrap().is_empty());
        assert!(state.is_verified(&"a".into()));
        assert_eq!(state.witnesses(&"a".into()), 4);
    }

    #[test]
    fn test_same_replica_counted_once() {
        let mut state = state();
        for sequence in 1..=5 {
            assert!(state.on_log(&entry(1, sequence, "a")).unwrap().is_empty());
        }
        assert_eq!(state.witnesses(&"a".into()), 1);
    }

    #[test]
    fn test_head_blocks_later_hashes() {
        let mut state = state();
        state.on_log(&entry(1, 1, "a")).unwrap();
        for replica in 1..=3 {
            state.on_log(&entry(replica, 2, "b")).unwrap();
        }
        // "b" has quorum but "a" is ahead of it.
        assert!(!state.is_verified(&"b".into()));
        assert_eq!(state.stalled_head(), Some((TxHash::from("a"), 1)));

        state.on_log(&entry(2, 1, "a")).unwrap();
        let emitted = state.on_log(&entry(3, 1, "a")).unwrap();
        assert_eq!(emitted, vec![TxHash::from("a"), TxHash::from("b")]);
        assert_eq!(state.stalled_head(), None);
    }

    #[test]
    fn test_defer_unblocks_fifo() {
        let mut state = state();
        state.on_log(&entry(1, 1, "a")).unwrap();
        for replica in 1..=3 {
            state.on_log(&entry(replica, 2, "b")).unwrap();
        }
        assert_eq!(state.defer(&"a".into()), Some(1));
        assert_eq!(state.scan(), vec![TxHash::from("b")]);
        // "a" is still pending and still unverified.
        assert_eq!(state.pending_len(), 1);
        assert!(!state.is_verified(&"a".into()));
    }

    #[test]
    fn test_defer_ignores_non_head() {
        let mut state = state();
        state.on_log(&entry(1, 1, "a")).unwrap();
        state.on_log(&entry(1, 2, "b")).unwrap();
        assert_eq!(state.defer(&"b".into()), None);
    }

    #[test]
    fn test_retired_hashes_are_forgotten() {
        let mut state = state();
        for replica in 1..=3 {
            state.on_log(&entry(replica, 1, "a")).unwrap();
        }
        state.on_retired(&RetiredBatch {
            batch_seq: 1,
            members: BTreeSet::from([TxHash::from("a")]),
        });
        assert!(!state.is_verified(&"a".into()));
        assert_eq!(state.tombstones(), 1);

        // The last outstanding report is swallowed and frees the tombstone.
        assert!(state.on_log(&entry(4, 1, "a")).unwrap().is_empty());
        assert_eq!(state.witnesses(&"a".into()), 0);
        assert_eq!(state.pending_len(), 0);
        assert_eq!(state.tombstones(), 0);
    }

    #[test]
    fn test_withdrawn_head_leaves_fifo() {
        let mut state = state();
        state.on_log(&entry(1, 1, "bogus")).unwrap();
        for replica in 1..=3 {
            state.on_log(&entry(replica, 2, "a")).unwrap();
        }
        assert_eq!(state.stalled_head(), Some((TxHash::from("bogus"), 1)));

        state.on_retired(&RetiredBatch {
            batch_seq: 1,
            members: BTreeSet::from([TxHash::from("bogus")]),
        });
        assert_eq!(state.scan(), vec![TxHash::from("a")]);
        assert_eq!(state.stalled_head(), None);

        // Replicas echoing the bogus hash later do not revive it.
        for replica in 2..=4 {
            assert!(state.on_log(&entry(replica, 3, "bogus")).unwrap().is_empty());
        }
        assert_eq!(state.pending_len(), 0);
    }

    #[test]
    fn test_unknown_replica_rejected() {
        let mut state = state();
        assert_eq!(
            state.on_log(&entry(0, 1, "a")),
            Err(CertificationError::UnknownReplica { replica: 0, n: 4 })
        );
    }
}
