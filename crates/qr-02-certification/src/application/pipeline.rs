//! One replica's certification pipeline.
//!
//! `submit` is the fan-out point: every released log entry is copied into
//! the paving, verifying and graphing inboxes. Stages talk to each other only
//! over the channels wired here.

use crate::algorithms::{GraphingState, GraphingWait, PavingState, StallKey, VerifyingState};
use crate::application::graphing_stage::{GraphingInputs, GraphingOutputs, GraphingStage};
use crate::application::paving_stage::{PavingInputs, PavingStage};
use crate::application::timer::{LivenessTimer, TimerFired};
use crate::application::verifying_stage::{VerifyingInputs, VerifyingStage};
use crate::config::CertificationConfig;
use crate::domain::CertificationError;
use crate::ports::CertificationApi;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, LivenessStage};
use shared_types::{
    AtomicStatusSet, FaultModel, FinalizedGraph, OrderedLogEntry, ReplicaId, StatusFlag,
    StatusSet, TxHash,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Timer fires are rare; a handful of slots is plenty.
const TIMER_CHANNEL_CAPACITY: usize = 16;

struct LogFanout {
    paving: mpsc::Sender<OrderedLogEntry>,
    verifying: mpsc::Sender<OrderedLogEntry>,
    graphing: mpsc::Sender<OrderedLogEntry>,
}

/// Stages built by `new` and not yet spawned.
struct IdleStages {
    paving: (PavingStage, PavingInputs),
    verifying: (VerifyingStage, VerifyingInputs),
    graphing: (GraphingStage, GraphingInputs),
}

pub struct Pipeline {
    node: ReplicaId,
    model: FaultModel,
    status: Arc<AtomicStatusSet>,
    fanout: LogFanout,
    idle: Mutex<Option<IdleStages>>,
    shutdown: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Pipeline {
    /// Build the stages for replica `node`. Finalized graphs go to `graphs`.
    ///
    /// Entries submitted before [`Pipeline::start`] wait in the stage inboxes.
    pub fn new(
        node: ReplicaId,
        config: CertificationConfig,
        bus: Arc<dyn EventPublisher>,
        graphs: mpsc::Sender<FinalizedGraph>,
    ) -> Result<Self, CertificationError> {
        let model = config.validate()?;
        let capacity = config.channel_capacity;
        let status = Arc::new(AtomicStatusSet::new());

        let (paving_log_tx, paving_log_rx) = mpsc::channel(capacity);
        let (verifying_log_tx, verifying_log_rx) = mpsc::channel(capacity);
        let (graphing_log_tx, graphing_log_rx) = mpsc::channel(capacity);
        let (batch_tx, batch_rx) = mpsc::channel(capacity);
        let (verified_tx, verified_rx) = mpsc::channel(capacity);
        let (retire_paving_tx, retire_paving_rx) = mpsc::channel(capacity);
        let (retire_verifying_tx, retire_verifying_rx) = mpsc::channel(capacity);
        let (withdraw_tx, withdraw_rx) = mpsc::channel(capacity);
        let (paving_fire_tx, paving_fire_rx) = mpsc::channel::<TimerFired<StallKey>>(TIMER_CHANNEL_CAPACITY);
        let (gathering_fire_tx, gathering_fire_rx) = mpsc::channel::<TimerFired<TxHash>>(TIMER_CHANNEL_CAPACITY);
        let (appointing_fire_tx, appointing_fire_rx) = mpsc::channel::<TimerFired<GraphingWait>>(TIMER_CHANNEL_CAPACITY);

        let paving = PavingStage {
            node,
            state: PavingState::new(model, config.batch_capacity)
                .with_tombstone_window(config.tombstone_window),
            timer: LivenessTimer::new(
                LivenessStage::Paving,
                config.liveness_delay,
                paving_fire_tx,
                Arc::clone(&status),
            ),
            bus: Arc::clone(&bus),
            batches: batch_tx,
        };
        let verifying = VerifyingStage {
            node,
            state: VerifyingState::new(model).with_tombstone_window(config.tombstone_window),
            timer: LivenessTimer::new(
                LivenessStage::Gathering,
                config.liveness_delay,
                gathering_fire_tx,
                Arc::clone(&status),
            ),
            bus: Arc::clone(&bus),
            verified: verified_tx,
        };
        let graphing = GraphingStage {
            node,
            state: GraphingState::new(model).with_tombstone_window(config.tombstone_window),
            timer: LivenessTimer::new(
                LivenessStage::Appointing,
                config.liveness_delay,
                appointing_fire_tx,
                Arc::clone(&status),
            ),
            bus,
            outputs: GraphingOutputs {
                graphs,
                retire_paving: retire_paving_tx,
                retire_verifying: retire_verifying_tx,
                withdraw_paving: withdraw_tx,
            },
        };

        let idle = IdleStages {
            paving: (
                paving,
                PavingInputs {
                    logs: paving_log_rx,
                    retired: retire_paving_rx,
                    withdrawn: withdraw_rx,
                    fired: paving_fire_rx,
                },
            ),
            verifying: (
                verifying,
                VerifyingInputs {
                    logs: verifying_log_rx,
                    retired: retire_verifying_rx,
                    fired: gathering_fire_rx,
                },
            ),
            graphing: (
                graphing,
                GraphingInputs {
                    logs: graphing_log_rx,
                    batches: batch_rx,
                    verified: verified_rx,
                    fired: appointing_fire_rx,
                },
            ),
        };

        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            node,
            model,
            status,
            fanout: LogFanout {
                paving: paving_log_tx,
                verifying: verifying_log_tx,
                graphing: graphing_log_tx,
            },
            idle: Mutex::new(Some(idle)),
            shutdown,
            handles: Mutex::new(Vec::new()),
        })
    }

    pub fn node(&self) -> ReplicaId {
        self.node
    }

    pub fn fault_model(&self) -> FaultModel {
        self.model
    }

    /// Wait for every stage worker to exit.
    pub async fn join(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    error!(node = self.node, error = %err, "[qr-02] stage worker panicked");
                }
            }
        }
    }
}

#[async_trait]
impl CertificationApi for Pipeline {
    fn start(&self) -> Result<(), CertificationError> {
        if self.status.has(StatusFlag::Stopping) {
            return Err(CertificationError::PipelineStopped);
        }
        if !self.status.on(StatusFlag::Running) {
            return Ok(());
        }
        let Some(idle) = self.idle.lock().take() else {
            return Ok(());
        };

        let (paving, paving_inputs) = idle.paving;
        let (verifying, verifying_inputs) = idle.verifying;
        let (graphing, graphing_inputs) = idle.graphing;
        let mut handles = self.handles.lock();
        handles.push(tokio::spawn(
            paving.run(paving_inputs, self.shutdown.subscribe()),
        ));
        handles.push(tokio::spawn(
            verifying.run(verifying_inputs, self.shutdown.subscribe()),
        ));
        handles.push(tokio::spawn(
            graphing.run(graphing_inputs, self.shutdown.subscribe()),
        ));

        info!(
            node = self.node,
            n = self.model.n(),
            quorum = self.model.quorum(),
            majority = self.model.majority(),
            "[qr-02] pipeline started"
        );
        Ok(())
    }

    fn stop(&self) {
        if !self.status.on(StatusFlag::Stopping) {
            return;
        }
        // No receivers only means no stage was ever spawned.
        let _ = self.shutdown.send(true);
        self.status.off(StatusFlag::Running);
        info!(node = self.node, "[qr-02] pipeline stopping");
    }

    async fn submit(
        &self,
        replica_id: ReplicaId,
        entry: OrderedLogEntry,
    ) -> Result<(), CertificationError> {
        if self.status.has(StatusFlag::Stopping) {
            return Err(CertificationError::PipelineStopped);
        }
        if entry.replica_id != replica_id {
            return Err(CertificationError::ReplicaMismatch {
                submitted: replica_id,
                entry: entry.replica_id,
            });
        }
        if !self.model.is_known(replica_id) {
            return Err(CertificationError::UnknownReplica {
                replica: replica_id,
                n: self.model.n(),
            });
        }

        self.fanout
            .paving
            .send(entry.clone())
            .await
            .map_err(|_| CertificationError::ChannelClosed("paving"))?;
        self.fanout
            .verifying
            .send(entry.clone())
            .await
            .map_err(|_| CertificationError::ChannelClosed("verifying"))?;
        self.fanout
            .graphing
            .send(entry)
            .await
            .map_err(|_| CertificationError::ChannelClosed("graphing"))?;
        Ok(())
    }

    fn status(&self) -> StatusSet {
        self.status.snapshot()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
