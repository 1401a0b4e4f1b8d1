//! Error types for sequencing

use thiserror::Error;

/// All errors that can occur while sequencing requests and log entries.
///
/// None of these is fatal: callers log them and drop the offending item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencingError {
    /// Item routed to a sequencer bound to a different source
    #[error("Source mismatch: sequencer bound to {expected}, item from {actual}")]
    SourceMismatch { expected: u64, actual: u64 },

    /// Item that can never be released (zero sequence, empty hash)
    #[error("Malformed item from source {source_id}: {reason}")]
    MalformedItem { source_id: u64, reason: String },

    /// Sequence number already waiting in the reorder cache
    #[error("Duplicate sequence {sequence} from source {source_id}")]
    DuplicateSequence { source_id: u64, sequence: u64 },

    /// Sequence number already released
    #[error("Stale sequence {sequence} from source {source_id}: released up to {counter}")]
    StaleSequence {
        source_id: u64,
        sequence: u64,
        counter: u64,
    },

    /// No sequencer registered for this source
    #[error("Unknown source: {0}")]
    UnknownSource(u64),

    /// Source registered twice
    #[error("Source already registered: {0}")]
    SourceAlreadyRegistered(u64),

    /// Sequencer worker for this source is gone
    #[error("Sequencer for source {0} stopped")]
    SourceStopped(u64),

    /// Transaction not present in the store
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Empty proposal
    #[error("Empty proposal")]
    EmptyProposal,

    /// Transport refused a broadcast
    #[error("Transport error: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SequencingError::StaleSequence {
            source_id: 2,
            sequence: 3,
            counter: 5,
        };
        assert_eq!(
            err.to_string(),
            "Stale sequence 3 from source 2: released up to 5"
        );
    }

    #[test]
    fn test_unknown_source_display() {
        assert_eq!(SequencingError::UnknownSource(9).to_string(), "Unknown source: 9");
    }
}
