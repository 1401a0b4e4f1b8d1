//! Position-indexed copy of one replica's released log.

use shared_types::{OrderedLogEntry, ReplicaId, SequenceNumber, TxHash};
use std::collections::{BTreeMap, HashMap};

/// One replica's log entries, keyed both by sequence and by hash.
///
/// Positions are 1-based ranks over the entries still present, so they shift
/// down as retired hashes are removed. Sequences never change.
#[derive(Debug, Clone)]
pub struct ReplicaLog {
    replica_id: ReplicaId,
    by_sequence: BTreeMap<SequenceNumber, TxHash>,
    by_hash: HashMap<TxHash, SequenceNumber>,
}

impl ReplicaLog {
    pub fn new(replica_id: ReplicaId) -> Self {
        Self {
            replica_id,
            by_sequence: BTreeMap::new(),
            by_hash: HashMap::new(),
        }
    }

    pub fn replica_id(&self) -> ReplicaId {
        self.replica_id
    }

    /// Returns `false` if the hash or the sequence is already present; the
    /// first report of a hash keeps its place.
    pub fn append(&mut self, entry: &OrderedLogEntry) -> bool {
        if self.by_hash.contains_key(&entry.tx_hash)
            || self.by_sequence.contains_key(&entry.sequence)
        {
            return false;
        }
        self.by_sequence.insert(entry.sequence, entry.tx_hash.clone());
        self.by_hash.insert(entry.tx_hash.clone(), entry.sequence);
        true
    }

    /// Sequence at which this replica logged `hash`.
    pub fn sequence_of(&self, hash: &TxHash) -> Option<SequenceNumber> {
        self.by_hash.get(hash).copied()
    }

    /// Hash at 1-based `position`.
    pub fn get_by_position(&self, position: usize) -> Option<&TxHash> {
        let index = position.checked_sub(1)?;
        self.by_sequence.values().nth(index)
    }

    pub fn remove(&mut self, hash: &TxHash) -> bool {
        match self.by_hash.remove(hash) {
            Some(sequence) => {
                self.by_sequence.remove(&sequence);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.by_hash.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.by_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sequence.is_empty()
    }
}
