//! # In-Process Cluster
//!
//! N [`ReplicaNode`]s sharing one loopback network, one event bus and one
//! transaction store, plus helpers to drive simulated clients against them.

use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::network::LoopbackNetwork;
use crate::replica::{OrderedEntry, ReplicaNode};
use qr_01_sequencing::{
    InMemoryTransactionStore, ProposalApi, RequestForwarder, Sha256TxHasher, TransactionStore,
};
use shared_bus::InMemoryEventBus;
use shared_types::{ClientId, ReplicaId, Transaction, TxHash};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

pub struct Cluster {
    config: NodeConfig,
    network: Arc<LoopbackNetwork>,
    bus: Arc<InMemoryEventBus>,
    store: Arc<InMemoryTransactionStore>,
    replicas: Vec<ReplicaNode>,
}

impl Cluster {
    /// Spawn every replica named by the fault model. Must run inside a tokio
    /// runtime.
    pub fn spawn(config: NodeConfig) -> Result<Self, NodeError> {
        let model = config.validate()?;
        let (network, inboxes) =
            LoopbackNetwork::new(model.replicas(), config.channel_capacity, config.jitter);
        let bus = Arc::new(InMemoryEventBus::new());

        let mut replicas = Vec::with_capacity(model.n());
        for (id, inbox) in inboxes {
            replicas.push(ReplicaNode::spawn(
                id,
                &config,
                network.endpoint(Some(id)),
                inbox,
                Arc::clone(&bus),
            )?);
        }

        info!(
            replicas = model.n(),
            batch_capacity = config.batch_capacity,
            jitter_ms = config.jitter.as_millis() as u64,
            "[relay] cluster started"
        );
        Ok(Self {
            config,
            network,
            bus,
            store: Arc::new(InMemoryTransactionStore::new(Arc::new(Sha256TxHasher))),
            replicas,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn network(&self) -> &Arc<LoopbackNetwork> {
        &self.network
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    pub fn store(&self) -> &Arc<InMemoryTransactionStore> {
        &self.store
    }

    pub fn replicas(&self) -> &[ReplicaNode] {
        &self.replicas
    }

    pub fn replica(&self, id: ReplicaId) -> Result<&ReplicaNode, NodeError> {
        self.replicas
            .iter()
            .find(|replica| replica.id() == id)
            .ok_or(NodeError::UnknownReplica(id))
    }

    /// Register `client_id` with every replica and return its forwarder.
    pub fn client(&self, client_id: ClientId) -> Result<RequestForwarder, NodeError> {
        for replica in &self.replicas {
            replica.register_client(client_id)?;
        }
        Ok(RequestForwarder::new(
            client_id,
            Arc::clone(&self.store) as Arc<dyn TransactionStore>,
            self.network.endpoint(None),
        ))
    }

    /// Run `clients` concurrent clients, each proposing `txs` one-transaction
    /// requests. Returns the hashes of every accepted proposal.
    pub async fn drive_clients(&self, clients: usize, txs: usize) -> Result<Vec<TxHash>, NodeError> {
        let mut tasks = JoinSet::new();
        for client_id in 1..=clients as ClientId {
            let forwarder = self.client(client_id)?;
            tasks.spawn(async move {
                let mut hashes = Vec::with_capacity(txs);
                for index in 0..txs {
                    let tx = Transaction::new(format!("client-{client_id}-tx-{index}"));
                    match forwarder.propose(vec![tx]).await {
                        Ok(request) => hashes.extend(request.tx_hashes),
                        Err(err) => error!(client = client_id, error = %err, "[relay] proposal failed"),
                    }
                }
                hashes
            });
        }

        let mut proposed = Vec::new();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(hashes) => proposed.extend(hashes),
                Err(err) => error!(error = %err, "[relay] client task failed"),
            }
        }
        Ok(proposed)
    }

    /// Wait until every replica has ordered at least `count` batches.
    pub async fn wait_for_batches(&self, count: u64) -> Result<(), NodeError> {
        for replica in &self.replicas {
            replica.wait_for_batches(count).await?;
        }
        Ok(())
    }

    /// The order shared by every replica, over the batches all of them have
    /// ordered.
    pub fn agreed_order(&self) -> Result<Vec<OrderedEntry>, NodeError> {
        let Some((first, rest)) = self.replicas.split_first() else {
            return Ok(Vec::new());
        };
        let mut agreed = first.ordered();
        for replica in rest {
            let ordered = replica.ordered();
            agreed.truncate(ordered.len());
            for (mine, theirs) in agreed.iter().zip(&ordered) {
                if mine != theirs {
                    return Err(NodeError::Diverged {
                        batch_seq: mine.0,
                        left: first.id(),
                        right: replica.id(),
                    });
                }
            }
        }
        Ok(agreed)
    }

    pub async fn shutdown(&self) {
        for replica in &self.replicas {
            replica.shutdown().await;
        }
        info!("[relay] cluster stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn config() -> NodeConfig {
        NodeConfig {
            channel_capacity: 64,
            ..NodeConfig::default()
        }
    }

    #[tokio::test]
    async fn test_single_client_single_batch() {
        let cluster = Cluster::spawn(config()).unwrap();
        let proposed = cluster.drive_clients(1, 5).await.unwrap();
        assert_eq!(proposed.len(), 5);

        timeout(Duration::from_secs(5), cluster.wait_for_batches(1))
            .await
            .expect("timeout")
            .unwrap();
        let agreed = cluster.agreed_order().unwrap();
        assert_eq!(agreed.len(), 1);
        assert_eq!(agreed[0].0, 1);
        // One client, no jitter: every replica logged the proposal order.
        assert_eq!(agreed[0].1, proposed);

        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn test_client_registered_everywhere() {
        let cluster = Cluster::spawn(config()).unwrap();
        cluster.client(7).unwrap();
        assert!(matches!(
            cluster.client(7),
            Err(NodeError::Sequencing(_))
        ));
        assert!(matches!(
            cluster.replica(9),
            Err(NodeError::UnknownReplica(9))
        ));
        cluster.shutdown().await;
    }
}
