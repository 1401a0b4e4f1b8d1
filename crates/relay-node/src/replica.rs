//! # Replica Wiring
//!
//! One in-process replica: sequencing, certification and the graph engine,
//! joined by channels and driven by a shared shutdown signal.
//!
//! ```text
//! inbox ──► router ──┬─► client registry ──► LocalOrderService ──► network
//!                    │                              │
//!                    └─► replica registry ◄─────────┘
//!                              │
//!                              ▼
//!                    Pipeline::submit ──► EngineHandle ──► ordered batches
//! ```

use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::network::{LoopbackEndpoint, NetworkMessage};
use parking_lot::Mutex;
use qr_01_sequencing::{LocalOrderService, LocalOrderer, SequencerRegistry, SourceKind, Transport};
use qr_02_certification::{CertificationApi, CertificationError, Pipeline};
use qr_03_graph_engine::{EngineHandle, GraphEngine};
use shared_bus::{EventFilter, EventPublisher, EventTopic, InMemoryEventBus, OrderingEvent};
use shared_types::{BatchSeq, ClientId, OrderedLogEntry, OrderedRequest, ReplicaId, StatusSet, TxHash};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// One batch as the engine ordered it.
pub type OrderedEntry = (BatchSeq, Vec<TxHash>);

pub struct ReplicaNode {
    id: ReplicaId,
    pipeline: Arc<Pipeline>,
    engine: EngineHandle,
    clients: Arc<SequencerRegistry<OrderedRequest>>,
    orders: Arc<Mutex<Vec<OrderedEntry>>>,
    progress: watch::Receiver<u64>,
    shutdown: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ReplicaNode {
    /// Build replica `id`, spawn its workers and start its pipeline.
    ///
    /// Must run inside a tokio runtime.
    pub fn spawn(
        id: ReplicaId,
        config: &NodeConfig,
        transport: Arc<LoopbackEndpoint>,
        inbox: mpsc::Receiver<NetworkMessage>,
        bus: Arc<InMemoryEventBus>,
    ) -> Result<Self, NodeError> {
        let model = config.validate()?;
        let capacity = config.channel_capacity;
        let (shutdown, shutdown_rx) = watch::channel(false);

        // 1. Certification and graph engine
        let (graph_tx, graph_rx) = mpsc::channel(capacity);
        let publisher: Arc<dyn EventPublisher> = bus.clone();
        let pipeline = Arc::new(Pipeline::new(
            id,
            config.certification(),
            Arc::clone(&publisher),
            graph_tx,
        )?);

        let orders: Arc<Mutex<Vec<OrderedEntry>>> = Arc::default();
        let (progress_tx, progress) = watch::channel(0u64);
        let mut engine = GraphEngine::new(id, config.engine());
        let sink = Arc::clone(&orders);
        engine.on_finalized_order(move |batch_seq, order| {
            sink.lock().push((batch_seq, order.to_vec()));
            progress_tx.send_modify(|count| *count += 1);
        });
        let engine = EngineHandle::new(engine, graph_rx, publisher);

        // 2. Sequencing
        let (released_tx, released_rx) = mpsc::channel::<TxHash>(capacity);
        let (entries_tx, entries_rx) = mpsc::channel::<OrderedLogEntry>(capacity);
        let clients = Arc::new(SequencerRegistry::new(
            SourceKind::Client,
            config.sequencing(),
            released_tx,
            shutdown_rx.clone(),
        ));
        let replicas = Arc::new(SequencerRegistry::new(
            SourceKind::Replica,
            config.sequencing(),
            entries_tx,
            shutdown_rx.clone(),
        ));
        for replica in model.replicas() {
            replicas.register_source(replica)?;
        }
        let orderer = LocalOrderService::new(
            LocalOrderer::new(id),
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&replicas),
        );

        // 3. Workers
        let handles = vec![
            tokio::spawn(orderer.run(released_rx, shutdown_rx.clone())),
            tokio::spawn(route_inbox(
                id,
                inbox,
                Arc::clone(&clients),
                replicas,
                shutdown_rx.clone(),
            )),
            tokio::spawn(submit_entries(
                Arc::clone(&pipeline),
                entries_rx,
                shutdown_rx.clone(),
            )),
            tokio::spawn(report_suspects(
                id,
                &bus,
                transport,
                shutdown_rx,
            )),
        ];

        engine.start()?;
        pipeline.start()?;
        info!(
            replica = id,
            n = model.n(),
            f = model.f(),
            quorum = model.quorum(),
            "[relay] replica started"
        );

        Ok(Self {
            id,
            pipeline,
            engine,
            clients,
            orders,
            progress,
            shutdown,
            handles: Mutex::new(handles),
        })
    }

    pub fn id(&self) -> ReplicaId {
        self.id
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn status(&self) -> StatusSet {
        self.pipeline.status()
    }

    pub fn engine_status(&self) -> StatusSet {
        self.engine.status()
    }

    /// Accept requests from `client_id` from now on.
    pub fn register_client(&self, client_id: ClientId) -> Result<(), NodeError> {
        Ok(self.clients.register_source(client_id)?)
    }

    /// Batches ordered so far, ascending.
    pub fn ordered(&self) -> Vec<OrderedEntry> {
        self.orders.lock().clone()
    }

    pub fn ordered_count(&self) -> u64 {
        *self.progress.borrow()
    }

    /// Wait until at least `count` batches have been ordered.
    pub async fn wait_for_batches(&self, count: u64) -> Result<(), NodeError> {
        let mut progress = self.progress.clone();
        progress
            .wait_for(|ordered| *ordered >= count)
            .await
            .map(|_| ())
            .map_err(|_| NodeError::Stopped(self.id))
    }

    /// Stop the pipeline and the engine, signal every worker and wait for
    /// them. Calling it again is harmless.
    pub async fn shutdown(&self) {
        self.pipeline.stop();
        self.engine.stop();
        let _ = self.shutdown.send(true);

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    error!(replica = self.id, error = %err, "[relay] worker panicked");
                }
            }
        }
        self.pipeline.join().await;
        self.engine.join().await;
        info!(replica = self.id, ordered = self.ordered_count(), "[relay] replica stopped");
    }
}

/// Split the network inbox between the client and replica registries.
async fn route_inbox(
    id: ReplicaId,
    mut inbox: mpsc::Receiver<NetworkMessage>,
    clients: Arc<SequencerRegistry<OrderedRequest>>,
    replicas: Arc<SequencerRegistry<OrderedLogEntry>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            maybe_message = inbox.recv() => {
                let Some(message) = maybe_message else { break };
                let result = match message {
                    NetworkMessage::Request(request) => clients.dispatch(request).await,
                    NetworkMessage::Log(entry) => replicas.dispatch(entry).await,
                };
                if let Err(err) = result {
                    error!(replica = id, error = %err, "[relay] message dropped");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!(replica = id, "[relay] inbox router stopped");
}

/// Feed released log entries to the certification pipeline.
async fn submit_entries(
    pipeline: Arc<Pipeline>,
    mut entries: mpsc::Receiver<OrderedLogEntry>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            maybe_entry = entries.recv() => {
                let Some(entry) = maybe_entry else { break };
                let source = entry.replica_id;
                if let Err(err) = pipeline.submit(source, entry).await {
                    report_rejection(pipeline.node(), source, &err);
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

fn report_rejection(replica: ReplicaId, source: ReplicaId, err: &CertificationError) {
    match err {
        // The replica registry admitted a source certification never heard of.
        CertificationError::UnknownReplica { .. } => {
            error!(replica, source, error = %err, "[relay] entry from unknown replica");
        }
        _ => warn!(replica, source, error = %err, "[relay] entry not certified"),
    }
}

/// Forward this replica's liveness suspicions to the transport.
fn report_suspects(
    id: ReplicaId,
    bus: &InMemoryEventBus,
    transport: Arc<LoopbackEndpoint>,
    mut shutdown: watch::Receiver<bool>,
) -> impl std::future::Future<Output = ()> + Send + 'static {
    let mut events = bus.subscribe(EventFilter {
        topics: vec![EventTopic::Liveness],
        nodes: vec![id],
    });
    async move {
        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    let Some(event) = maybe_event else { break };
                    if let OrderingEvent::ReplicaSuspected { suspect, .. } = event {
                        if let Err(err) = transport.suspect(suspect).await {
                            warn!(replica = id, suspect, error = %err, "[relay] suspicion not sent");
                        }
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn entry(replica_id: ReplicaId, sequence: u64) -> OrderedLogEntry {
        OrderedLogEntry {
            replica_id,
            sequence,
            tx_hash: TxHash::from("aa"),
            timestamp: sequence,
        }
    }

    #[tokio::test]
    async fn test_unknown_replica_entry_does_not_stop_submitter() {
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        let (graph_tx, _graph_rx) = mpsc::channel(8);
        let pipeline = Arc::new(
            Pipeline::new(1, NodeConfig::default().certification(), bus, graph_tx).unwrap(),
        );
        pipeline.start().unwrap();
        assert!(matches!(
            pipeline.submit(9, entry(9, 1)).await,
            Err(CertificationError::UnknownReplica { replica: 9, n: 4 })
        ));

        // Capacity one: each send waits for the previous entry to be taken.
        let (entries_tx, entries_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let submitter = tokio::spawn(submit_entries(Arc::clone(&pipeline), entries_rx, shutdown_rx));
        for next in [entry(9, 1), entry(2, 1), entry(3, 1)] {
            timeout(Duration::from_secs(1), entries_tx.send(next))
                .await
                .expect("submitter stalled")
                .unwrap();
        }

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(1), submitter)
            .await
            .expect("submitter did not stop")
            .unwrap();
        pipeline.stop();
        pipeline.join().await;
    }
}
