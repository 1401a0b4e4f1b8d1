//! Items that carry a per-source sequence number.

use crate::domain::errors::SequencingError;
use shared_types::{OrderedLogEntry, OrderedRequest, TxHash};

/// An item a [`GapSequencer`](crate::algorithms::GapSequencer) can order.
///
/// `Release` is what flows downstream once the item is in order: a request
/// releases one hash per element of its list, a log entry releases itself.
pub trait Sequenced: Send + 'static {
    type Release: Send + 'static;

    fn source_id(&self) -> u64;
    fn sequence(&self) -> u64;
    fn timestamp(&self) -> u64;

    /// Reject items that could never be released.
    fn validate(&self) -> Result<(), SequencingError> {
        if self.sequence() == 0 {
            return Err(SequencingError::MalformedItem {
                source_id: self.source_id(),
                reason: "sequence numbers start at 1".to_string(),
            });
        }
        Ok(())
    }

    fn into_releases(self) -> Vec<Self::Release>;
}

impl Sequenced for OrderedRequest {
    type Release = TxHash;

    fn source_id(&self) -> u64 {
        self.client_id
    }

    fn sequence(&self) -> u64 {
        self.sequence
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn validate(&self) -> Result<(), SequencingError> {
        if self.sequence == 0 {
            return Err(SequencingError::MalformedItem {
                source_id: self.client_id,
                reason: "sequence numbers start at 1".to_string(),
            });
        }
        if self.tx_hashes.iter().any(TxHash::is_empty) {
            return Err(SequencingError::MalformedItem {
                source_id: self.client_id,
                reason: "empty transaction hash".to_string(),
            });
        }
        Ok(())
    }

    fn into_releases(self) -> Vec<TxHash> {
        self.tx_hashes
    }
}

impl Sequenced for OrderedLogEntry {
    type Release = OrderedLogEntry;

    fn source_id(&self) -> u64 {
        self.replica_id
    }

    fn sequence(&self) -> u64 {
        self.sequence
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn validate(&self) -> Result<(), SequencingError> {
        if self.sequence == 0 {
            return Err(SequencingError::MalformedItem {
                source_id: self.replica_id,
                reason: "sequence numbers start at 1".to_string(),
            });
        }
        if self.tx_hash.is_empty() {
            return Err(SequencingError::MalformedItem {
                source_id: self.replica_id,
                reason: "empty transaction hash".to_string(),
            });
        }
        Ok(())
    }

    fn into_releases(self) -> Vec<OrderedLogEntry> {
        vec![self]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_releases_hashes_in_payload_order() {
        let request = OrderedRequest {
            client_id: 1,
            sequence: 1,
            tx_hashes: vec!["b".into(), "a".into()],
            timestamp: 10,
        };
        let expected: Vec<TxHash> = vec!["b".into(), "a".into()];
        assert_eq!(request.into_releases(), expected);
    }

    #[test]
    fn test_zero_sequence_is_malformed() {
        let entry = OrderedLogEntry {
            replica_id: 2,
            sequence: 0,
            tx_hash: "aa".into(),
            timestamp: 1,
        };
        assert!(matches!(
            entry.validate(),
            Err(SequencingError::MalformedItem { source_id: 2, .. })
        ));
    }

    #[test]
    fn test_empty_hash_is_malformed() {
        let entry = OrderedLogEntry {
            replica_id: 2,
            sequence: 1,
            tx_hash: TxHash::default(),
            timestamp: 1,
        };
        assert!(entry.validate().is_err());
    }
}
