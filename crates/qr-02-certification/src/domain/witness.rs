//! Per-hash witness set.

use shared_types::ReplicaId;
use std::collections::BTreeSet;

/// Replicas that have reported one transaction hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxWitnessRecord {
    ordered_by: BTreeSet<ReplicaId>,
}

impl TxWitnessRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `replica` had not reported this hash before.
    pub fn witness(&mut self, replica: ReplicaId) -> bool {
        self.ordered_by.insert(replica)
    }

    pub fn count(&self) -> usize {
        self.ordered_by.len()
    }

    pub fn witnesses(&self) -> impl Iterator<Item = &ReplicaId> {
        self.ordered_by.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_distinct_replicas() {
        let mut record = TxWitnessRecord::new();
        assert!(record.witness(1));
        assert!(!record.witness(1));
        assert!(record.witness(3));
        assert_eq!(record.count(), 2);
        assert_eq!(record.witnesses().copied().collect::<Vec<_>>(), vec![1, 3]);
    }
}
