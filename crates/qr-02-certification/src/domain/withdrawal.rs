//! Members pulled out of a paved batch before it could be graphed.

use shared_types::{BatchSeq, ReplicaId, RetiredBatch, TxHash};
use std::collections::BTreeSet;

/// Hashes of batch `batch_seq` that stayed below quorum witness past the
/// liveness delay. Paving re-paves `batch_seq` without them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    pub batch_seq: BatchSeq,
    pub hashes: BTreeSet<TxHash>,
    /// Replicas that logged a withdrawn hash.
    pub reporters: BTreeSet<ReplicaId>,
}

impl Withdrawal {
    /// Verifying only needs to forget the hashes.
    pub fn forgotten(&self) -> RetiredBatch {
        RetiredBatch {
            batch_seq: self.batch_seq,
            members: self.hashes.clone(),
        }
    }
}
