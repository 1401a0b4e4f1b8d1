//! Error types for certification

use shared_types::{BatchSeq, FaultModelError, ReplicaId};
use thiserror::Error;

/// All errors that can occur in the certification pipeline.
///
/// Stage workers log these and drop the offending message; none of them
/// stops the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertificationError {
    /// Entry from a replica outside `1..=N`
    #[error("Unknown replica: {replica} not in 1..={n}")]
    UnknownReplica { replica: ReplicaId, n: usize },

    /// `submit` called with an entry stamped by another replica
    #[error("Replica mismatch: submitted as {submitted}, entry from {entry}")]
    ReplicaMismatch { submitted: ReplicaId, entry: ReplicaId },

    /// Batch or retirement for a sequence the stage is not expecting
    #[error("Batch out of order: expected {expected}, got {actual}")]
    BatchOutOfOrder { expected: BatchSeq, actual: BatchSeq },

    /// Stage inbox closed
    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),

    /// `submit` after `stop`
    #[error("Pipeline stopped")]
    PipelineStopped,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Fault model: {0}")]
    FaultModel(#[from] FaultModelError),
}
