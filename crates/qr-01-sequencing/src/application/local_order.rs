//! Replica-side local ordering.
//!
//! Hashes released by the client sequencers are stamped with this replica's
//! next log sequence, broadcast to the other replicas and fed to this
//! replica's own log sequencer like any remote entry.

use crate::application::clock::MonotonicClock;
use crate::application::registry::SequencerRegistry;
use crate::ports::Transport;
use shared_types::{OrderedLogEntry, ReplicaId, TxHash};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Assigns this replica's log sequence numbers.
#[derive(Debug)]
pub struct LocalOrderer {
    replica_id: ReplicaId,
    last_sequence: u64,
    clock: MonotonicClock,
}

impl LocalOrderer {
    pub fn new(replica_id: ReplicaId) -> Self {
        Self {
            replica_id,
            last_sequence: 0,
            clock: MonotonicClock::new(),
        }
    }

    pub fn order(&mut self, tx_hash: TxHash) -> OrderedLogEntry {
        self.last_sequence += 1;
        OrderedLogEntry {
            replica_id: self.replica_id,
            sequence: self.last_sequence,
            tx_hash,
            timestamp: self.clock.tick(),
        }
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }
}

/// Worker driving a [`LocalOrderer`].
pub struct LocalOrderService {
    orderer: LocalOrderer,
    transport: Arc<dyn Transport>,
    replicas: Arc<SequencerRegistry<OrderedLogEntry>>,
}

impl LocalOrderService {
    pub fn new(
        orderer: LocalOrderer,
        transport: Arc<dyn Transport>,
        replicas: Arc<SequencerRegistry<OrderedLogEntry>>,
    ) -> Self {
        Self {
            orderer,
            transport,
            replicas,
        }
    }

    async fn handle(&mut self, tx_hash: TxHash) {
        let entry = self.orderer.order(tx_hash);
        debug!(
            replica = entry.replica_id,
            seq = entry.sequence,
            hash = %entry.tx_hash.short(),
            "[qr-01] local order"
        );

        if let Err(err) = self.transport.broadcast_log(entry.clone()).await {
            warn!(seq = entry.sequence, error = %err, "[qr-01] log broadcast failed");
        }
        if let Err(err) = self.replicas.dispatch(entry).await {
            error!(error = %err, "[qr-01] own log entry not accepted");
        }
    }

    /// Consume released client hashes until `shutdown` fires or the channel
    /// closes.
    pub async fn run(
        mut self,
        mut released: mpsc::Receiver<TxHash>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(replica = self.orderer.replica_id, "[qr-01] local orderer started");
        loop {
            tokio::select! {
                maybe_hash = released.recv() => {
                    let Some(tx_hash) = maybe_hash else { break };
                    self.handle(tx_hash).await;
                }
                _ = shutdown.changed() => {
                    break;
                }
            }
        }
        info!(
            replica = self.orderer.replica_id,
            ordered = self.orderer.last_sequence(),
            "[qr-01] local orderer stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::SourceKind;
    use crate::config::SequencingConfig;
    use crate::ports::mocks::RecordingTransport;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_orderer_assigns_gapless_sequences() {
        let mut orderer = LocalOrderer::new(3);
        let a = orderer.order("a".into());
        let b = orderer.order("b".into());
        assert_eq!((a.replica_id, a.sequence), (3, 1));
        assert_eq!((b.replica_id, b.sequence), (3, 2));
        assert!(b.timestamp > a.timestamp);
    }

    #[tokio::test]
    async fn test_service_broadcasts_and_feeds_own_sequencer() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (log_tx, mut log_rx) = mpsc::channel(16);
        let replicas = Arc::new(SequencerRegistry::new(
            SourceKind::Replica,
            SequencingConfig::default(),
            log_tx,
            shutdown_rx.clone(),
        ));
        replicas.register_source(1).unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let service = LocalOrderService::new(LocalOrderer::new(1), transport.clone(), replicas);

        let (hash_tx, hash_rx) = mpsc::channel(16);
        let handle = tokio::spawn(service.run(hash_rx, shutdown_rx));

        hash_tx.send("h1".into()).await.unwrap();
        hash_tx.send("h2".into()).await.unwrap();

        let first = timeout(Duration::from_secs(1), log_rx.recv()).await.unwrap().unwrap();
        let second = timeout(Duration::from_secs(1), log_rx.recv()).await.unwrap().unwrap();
        assert_eq!(first.tx_hash, TxHash::from("h1"));
        assert_eq!(second.sequence, 2);

        let logs = transport.logs.lock().clone();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].sequence, 1);

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
