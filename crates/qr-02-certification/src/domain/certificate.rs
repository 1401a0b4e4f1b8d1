//! Memoized pairwise priority verdicts.

use serde::{Deserialize, Serialize};
use shared_types::{ReplicaId, TxHash};
use std::collections::BTreeSet;

/// Ordered pair `(from, to)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationId {
    pub from: TxHash,
    pub to: TxHash,
}

impl RelationId {
    pub fn new(from: TxHash, to: TxHash) -> Self {
        Self { from, to }
    }

    pub fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationStatus {
    /// No majority yet and the completion requirement is not met.
    Undetermined,
    /// A majority logged `from` earlier than `to`.
    FromFirst,
    /// A majority logged `to` earlier than `from`.
    ToFirst,
    /// Every required replica voted and neither side reached a majority.
    Unordered,
}

impl RelationStatus {
    pub fn is_resolved(self) -> bool {
        self != Self::Undetermined
    }

    /// The same verdict seen from the reversed pair.
    pub fn mirrored(self) -> Self {
        match self {
            Self::FromFirst => Self::ToFirst,
            Self::ToFirst => Self::FromFirst,
            other => other,
        }
    }
}

/// Incrementally built verdict for one ordered pair.
///
/// A replica is scanned at most once and only when it has logged both
/// hashes; once `finished`, the certificate never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationCertificate {
    finished: bool,
    status: RelationStatus,
    scanned: BTreeSet<ReplicaId>,
    from_votes: usize,
    to_votes: usize,
}

impl Default for RelationCertificate {
    fn default() -> Self {
        Self {
            finished: false,
            status: RelationStatus::Undetermined,
            scanned: BTreeSet::new(),
            from_votes: 0,
            to_votes: 0,
        }
    }
}

impl RelationCertificate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn status(&self) -> RelationStatus {
        self.status
    }

    pub fn is_scanned(&self, replica: ReplicaId) -> bool {
        self.scanned.contains(&replica)
    }

    pub fn scanned_count(&self) -> usize {
        self.scanned.len()
    }

    pub fn votes(&self) -> (usize, usize) {
        (self.from_votes, self.to_votes)
    }

    /// Record `replica`'s verdict. Ignored once finished or if the replica
    /// already voted.
    pub fn vote(&mut self, replica: ReplicaId, from_first: bool) {
        if self.finished || !self.scanned.insert(replica) {
            return;
        }
        if from_first {
            self.from_votes += 1;
        } else {
            self.to_votes += 1;
        }
    }

    /// Finish with the majority side, if either side has reached `majority`.
    pub fn settle_majority(&mut self, majority: usize) -> bool {
        if self.finished {
            return true;
        }
        if self.from_votes >= majority {
            self.finish(RelationStatus::FromFirst);
        } else if self.to_votes >= majority {
            self.finish(RelationStatus::ToFirst);
        }
        self.finished
    }

    /// Finish as `Unordered` once `required` replicas have voted without a
    /// majority.
    pub fn settle_exhausted(&mut self, required: usize) -> bool {
        if !self.finished && self.scanned.len() >= required {
            self.finish(RelationStatus::Unordered);
        }
        self.finished
    }

    fn finish(&mut self, status: RelationStatus) {
        self.finished = true;
        self.status = status;
    }

    /// Certificate for the reversed pair, built from the same evidence.
    pub fn mirrored(&self) -> Self {
        Self {
            finished: self.finished,
            status: self.status.mirrored(),
            scanned: self.scanned.clone(),
            from_votes: self.to_votes,
            to_votes: self.from_votes,
        }
    }
}
