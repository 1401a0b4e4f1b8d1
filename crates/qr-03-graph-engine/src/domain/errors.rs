//! Error types for the graph engine

use shared_types::{BatchSeq, TxHash};
use thiserror::Error;

/// All errors that can occur while linearising finalized graphs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Finalized graph with no members
    #[error("Empty batch {batch_seq}")]
    EmptyBatch { batch_seq: BatchSeq },

    /// Edge endpoint outside the batch
    #[error("Edge in batch {batch_seq} references non-member {hash}")]
    ForeignEdge { batch_seq: BatchSeq, hash: TxHash },

    /// Batch already ordered or already buffered
    #[error("Stale batch {batch_seq}: next expected is {next}")]
    StaleBatch { batch_seq: BatchSeq, next: BatchSeq },

    /// Too many batches waiting for a gap to fill
    #[error("Reorder buffer full: {max} batches waiting")]
    BufferFull { max: usize },

    /// Engine was stopped and cannot be restarted
    #[error("Graph engine stopped")]
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::StaleBatch {
            batch_seq: 2,
            next: 4,
        };
        assert_eq!(err.to_string(), "Stale batch 2: next expected is 4");

        let err = EngineError::ForeignEdge {
            batch_seq: 1,
            hash: "zz".into(),
        };
        assert_eq!(err.to_string(), "Edge in batch 1 references non-member zz");
    }
}
