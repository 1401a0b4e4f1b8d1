//! Paving stage worker.

use crate::algorithms::{PavingState, PavingStatus, StallKey};
use crate::application::timer::{LivenessTimer, TimerFired};
use crate::domain::{CertificationError, Withdrawal};
use shared_bus::{EventPublisher, LivenessStage, OrderingEvent};
use shared_types::{OrderedLogEntry, PavedBatch, ReplicaId, RetiredBatch};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

pub(crate) struct PavingInputs {
    pub logs: mpsc::Receiver<OrderedLogEntry>,
    pub retired: mpsc::Receiver<RetiredBatch>,
    pub withdrawn: mpsc::Receiver<Withdrawal>,
    pub fired: mpsc::Receiver<TimerFired<StallKey>>,
}

pub(crate) struct PavingStage {
    pub node: ReplicaId,
    pub state: PavingState,
    pub timer: LivenessTimer<StallKey>,
    pub bus: Arc<dyn EventPublisher>,
    pub batches: mpsc::Sender<PavedBatch>,
}

impl PavingStage {
    pub async fn run(mut self, mut inputs: PavingInputs, mut shutdown: watch::Receiver<bool>) {
        info!(node = self.node, "[qr-02] paving stage started");
        loop {
            let status = tokio::select! {
                maybe_entry = inputs.logs.recv() => {
                    let Some(entry) = maybe_entry else { break };
                    match self.state.on_log(&entry) {
                        Ok(status) => status,
                        Err(err) => {
                            error!(node = self.node, error = %err, "[qr-02] paving dropped entry");
                            continue;
                        }
                    }
                }
                maybe_retired = inputs.retired.recv() => {
                    let Some(retired) = maybe_retired else { break };
                    match self.state.on_retired(&retired) {
                        Ok(status) => {
                            self.bus
                                .publish(OrderingEvent::BatchRetired {
                                    node: self.node,
                                    batch_seq: retired.batch_seq,
                                })
                                .await;
                            status
                        }
                        Err(err) => {
                            warn!(node = self.node, error = %err, "[qr-02] paving ignored retirement");
                            continue;
                        }
                    }
                }
                Some(withdrawal) = inputs.withdrawn.recv() => {
                    match self.state.on_withdrawn(&withdrawal) {
                        Ok(status) => status,
                        Err(err) => {
                            warn!(node = self.node, error = %err, "[qr-02] paving ignored withdrawal");
                            continue;
                        }
                    }
                }
                Some(fired) = inputs.fired.recv() => {
                    if !self.timer.take_fired(&fired) {
                        continue;
                    }
                    self.relax(fired.key).await;
                    self.state.advance()
                }
                _ = shutdown.changed() => break,
            };

            if !self.apply(status).await {
                break;
            }
        }
        self.timer.cancel();
        debug!(node = self.node, batch_seq = self.state.batch_seq(), "[qr-02] paving stage stopped");
    }

    async fn relax(&mut self, key: StallKey) {
        let suspects = self.state.relax(key);
        for suspect in suspects {
            warn!(
                node = self.node,
                suspect,
                batch_seq = key.batch_seq,
                position = key.position,
                "[qr-02] paving relaxed row to quorum"
            );
            self.bus
                .publish(OrderingEvent::ReplicaSuspected {
                    node: self.node,
                    suspect,
                    stage: LivenessStage::Paving,
                })
                .await;
        }
    }

    /// Returns `false` once graphing is gone.
    async fn apply(&mut self, status: PavingStatus) -> bool {
        match status {
            PavingStatus::Paved(batch) => {
                self.timer.cancel();
                info!(
                    node = self.node,
                    batch_seq = batch.batch_seq,
                    members = batch.members.len(),
                    "[qr-02] batch paved"
                );
                self.bus
                    .publish(OrderingEvent::BatchPaved {
                        node: self.node,
                        batch: batch.clone(),
                    })
                    .await;
                if self.batches.send(batch).await.is_err() {
                    let err = CertificationError::ChannelClosed("paved batches");
                    debug!(node = self.node, error = %err, "[qr-02] paving stage exiting");
                    return false;
                }
            }
            PavingStatus::Stalled { key, .. } => self.timer.arm(key),
            PavingStatus::AwaitingQuorum { .. } | PavingStatus::AwaitingRetirement(_) => {
                self.timer.cancel()
            }
        }
        true
    }
}
