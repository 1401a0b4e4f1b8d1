//! Outbound Ports (Driven Ports / SPI)

use crate::domain::errors::SequencingError;
use async_trait::async_trait;
use shared_types::{OrderedLogEntry, OrderedRequest, ReplicaId, Transaction, TxHash};

/// Message transport between clients and replicas.
///
/// Authentication and wire encoding live below this boundary.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a client's request to every replica.
    async fn broadcast_request(&self, request: OrderedRequest) -> Result<(), SequencingError>;

    /// Deliver a replica's log entry to every *other* replica.
    async fn broadcast_log(&self, entry: OrderedLogEntry) -> Result<(), SequencingError>;

    /// Report a replica that missed a liveness window.
    async fn suspect(&self, replica: ReplicaId) -> Result<(), SequencingError>;
}

/// Payload container keyed by content hash. No ordering is kept here.
pub trait TransactionStore: Send + Sync {
    /// Store `tx` and return its hash. Adding the same payload twice is a no-op.
    fn add(&self, tx: Transaction) -> TxHash;

    fn get(&self, hash: &TxHash) -> Option<Transaction>;

    fn remove(&self, hash: &TxHash) -> Result<Transaction, SequencingError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deterministic content hash naming a transaction.
pub trait TxHasher: Send + Sync {
    fn hash(&self, tx: &Transaction) -> TxHash;
}

/// Mock implementations for testing
#[cfg(test)]
pub mod mocks {
    use super::*;
    use parking_lot::Mutex;

    /// Transport that records every call
    #[derive(Default)]
    pub struct RecordingTransport {
        pub requests: Mutex<Vec<OrderedRequest>>,
        pub logs: Mutex<Vec<OrderedLogEntry>>,
        pub suspects: Mutex<Vec<ReplicaId>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn broadcast_request(&self, request: OrderedRequest) -> Result<(), SequencingError> {
            self.requests.lock().push(request);
            Ok(())
        }

        async fn broadcast_log(&self, entry: OrderedLogEntry) -> Result<(), SequencingError> {
            self.logs.lock().push(entry);
            Ok(())
        }

        async fn suspect(&self, replica: ReplicaId) -> Result<(), SequencingError> {
            self.suspects.lock().push(replica);
            Ok(())
        }
    }

    /// Transport whose every call fails
    pub struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn broadcast_request(&self, _request: OrderedRequest) -> Result<(), SequencingError> {
            Err(SequencingError::Transport("link down".to_string()))
        }

        async fn broadcast_log(&self, _entry: OrderedLogEntry) -> Result<(), SequencingError> {
            Err(SequencingError::Transport("link down".to_string()))
        }

        async fn suspect(&self, _replica: ReplicaId) -> Result<(), SequencingError> {
            Err(SequencingError::Transport("link down".to_string()))
        }
    }

    /// Hasher that names a transaction after its payload bytes
    pub struct PlainHasher;

    impl TxHasher for PlainHasher {
        fn hash(&self, tx: &Transaction) -> TxHash {
            TxHash::new(String::from_utf8_lossy(&tx.payload).into_owned())
        }
    }
}
