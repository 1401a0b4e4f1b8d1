//! Engine lifecycle: owns the worker so start and stop can be called any
//! number of times.

use crate::application::service::GraphEngine;
use crate::application::worker::run_engine;
use crate::domain::EngineError;
use parking_lot::Mutex;
use shared_bus::EventPublisher;
use shared_types::{AtomicStatusSet, FinalizedGraph, ReplicaId, StatusFlag, StatusSet};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

type IdleEngine = (GraphEngine, mpsc::Receiver<FinalizedGraph>);

pub struct EngineHandle {
    node: ReplicaId,
    bus: Arc<dyn EventPublisher>,
    status: AtomicStatusSet,
    idle: Mutex<Option<IdleEngine>>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EngineHandle {
    /// Wrap `engine`; nothing runs until [`start`](Self::start).
    pub fn new(
        engine: GraphEngine,
        graphs: mpsc::Receiver<FinalizedGraph>,
        bus: Arc<dyn EventPublisher>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            node: engine.node(),
            bus,
            status: AtomicStatusSet::new(),
            idle: Mutex::new(Some((engine, graphs))),
            shutdown,
            worker: Mutex::new(None),
        }
    }

    pub fn node(&self) -> ReplicaId {
        self.node
    }

    /// Spawn the worker. A second call is a no-op; a call after
    /// [`stop`](Self::stop) fails.
    ///
    /// Must run inside a tokio runtime.
    pub fn start(&self) -> Result<(), EngineError> {
        if self.status.has(StatusFlag::Stopping) {
            return Err(EngineError::Stopped);
        }
        if !self.status.on(StatusFlag::Running) {
            return Ok(());
        }
        let Some((engine, graphs)) = self.idle.lock().take() else {
            return Ok(());
        };
        let worker = tokio::spawn(run_engine(
            engine,
            graphs,
            Arc::clone(&self.bus),
            self.shutdown.subscribe(),
        ));
        *self.worker.lock() = Some(worker);
        info!(node = self.node, "[qr-03] engine handle started");
        Ok(())
    }

    pub fn stop(&self) {
        if !self.status.on(StatusFlag::Stopping) {
            return;
        }
        // No receivers only means the worker was never spawned.
        let _ = self.shutdown.send(true);
        self.status.off(StatusFlag::Running);
        info!(node = self.node, "[qr-03] engine stopping");
    }

    /// Wait for the worker to exit.
    pub async fn join(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(err) = worker.await {
                if !err.is_cancelled() {
                    error!(node = self.node, error = %err, "[qr-03] engine worker panicked");
                }
            }
        }
    }

    pub fn status(&self) -> StatusSet {
        self.status.snapshot()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
