//! Client-side request forwarding.

use crate::application::clock::MonotonicClock;
use crate::domain::errors::SequencingError;
use crate::ports::{ProposalApi, TransactionStore, Transport};
use async_trait::async_trait;
use shared_types::{ClientId, OrderedRequest, Transaction, TxHash};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

struct ForwarderState {
    last_sequence: u64,
    clock: MonotonicClock,
}

/// Turns proposals into this client's numbered [`OrderedRequest`]s.
///
/// The sequence number is committed only after the transport accepts the
/// request, so a failed broadcast never leaves a permanent gap.
pub struct RequestForwarder {
    client_id: ClientId,
    store: Arc<dyn TransactionStore>,
    transport: Arc<dyn Transport>,
    state: Mutex<ForwarderState>,
}

impl RequestForwarder {
    pub fn new(
        client_id: ClientId,
        store: Arc<dyn TransactionStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            client_id,
            store,
            transport,
            state: Mutex::new(ForwarderState {
                last_sequence: 0,
                clock: MonotonicClock::new(),
            }),
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }
}

#[async_trait]
impl ProposalApi for RequestForwarder {
    async fn propose(&self, txs: Vec<Transaction>) -> Result<OrderedRequest, SequencingError> {
        if txs.is_empty() {
            return Err(SequencingError::EmptyProposal);
        }
        let tx_hashes: Vec<TxHash> = txs.into_iter().map(|tx| self.store.add(tx)).collect();

        let mut state = self.state.lock().await;
        let request = OrderedRequest {
            client_id: self.client_id,
            sequence: state.last_sequence + 1,
            tx_hashes,
            timestamp: state.clock.tick(),
        };
        self.transport.broadcast_request(request.clone()).await?;
        state.last_sequence = request.sequence;

        debug!(
            client = self.client_id,
            seq = request.sequence,
            txs = request.tx_hashes.len(),
            "[qr-01] request broadcast"
        );
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryTransactionStore;
    use crate::ports::mocks::{FailingTransport, PlainHasher, RecordingTransport};

    fn store() -> Arc<InMemoryTransactionStore> {
        Arc::new(InMemoryTransactionStore::new(Arc::new(PlainHasher)))
    }

    #[tokio::test]
    async fn test_propose_numbers_and_stores() {
        let store = store();
        let transport = Arc::new(RecordingTransport::default());
        let forwarder = RequestForwarder::new(5, store.clone(), transport.clone());

        let first = forwarder
            .propose(vec![Transaction::new(b"a".to_vec()), Transaction::new(b"b".to_vec())])
            .await
            .unwrap();
        let second = forwarder
            .propose(vec![Transaction::new(b"c".to_vec())])
            .await
            .unwrap();

        assert_eq!((first.client_id, first.sequence), (5, 1));
        assert_eq!(second.sequence, 2);
        assert!(second.timestamp > first.timestamp);
        let expected: Vec<TxHash> = vec!["a".into(), "b".into()];
        assert_eq!(first.tx_hashes, expected);
        assert_eq!(store.len(), 3);
        assert_eq!(transport.requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_proposal_rejected() {
        let forwarder =
            RequestForwarder::new(1, store(), Arc::new(RecordingTransport::default()));
        assert_eq!(
            forwarder.propose(Vec::new()).await,
            Err(SequencingError::EmptyProposal)
        );
    }

    #[tokio::test]
    async fn test_failed_broadcast_does_not_consume_sequence() {
        let forwarder = RequestForwarder::new(1, store(), Arc::new(FailingTransport));
        let result = forwarder.propose(vec![Transaction::new(b"a".to_vec())]).await;
        assert!(matches!(result, Err(SequencingError::Transport(_))));
        assert_eq!(forwarder.state.lock().await.last_sequence, 0);
    }
}
