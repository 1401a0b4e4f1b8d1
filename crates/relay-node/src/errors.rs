//! Error types for the relay node

use crate::config::ConfigError;
use qr_01_sequencing::SequencingError;
use qr_02_certification::CertificationError;
use qr_03_graph_engine::EngineError;
use shared_types::{BatchSeq, ReplicaId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sequencing error: {0}")]
    Sequencing(#[from] SequencingError),

    #[error("Certification error: {0}")]
    Certification(#[from] CertificationError),

    #[error("Graph engine error: {0}")]
    Engine(#[from] EngineError),

    /// Replica shut down before the awaited progress
    #[error("Replica {0} stopped")]
    Stopped(ReplicaId),

    /// Two replicas ordered the same batch differently
    #[error("Replicas {left} and {right} diverged at batch {batch_seq}")]
    Diverged {
        batch_seq: BatchSeq,
        left: ReplicaId,
        right: ReplicaId,
    },

    #[error("Unknown replica: {0}")]
    UnknownReplica(ReplicaId),
}
