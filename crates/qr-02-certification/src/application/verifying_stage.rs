//! Verifying stage worker.

use crate::algorithms::VerifyingState;
use crate::application::timer::{LivenessTimer, TimerFired};
use shared_bus::{EventPublisher, OrderingEvent};
use shared_types::{OrderedLogEntry, ReplicaId, RetiredBatch, TxHash};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

pub(crate) struct VerifyingInputs {
    pub logs: mpsc::Receiver<OrderedLogEntry>,
    pub retired: mpsc::Receiver<RetiredBatch>,
    pub fired: mpsc::Receiver<TimerFired<TxHash>>,
}

pub(crate) struct VerifyingStage {
    pub node: ReplicaId,
    pub state: VerifyingState,
    pub timer: LivenessTimer<TxHash>,
    pub bus: Arc<dyn EventPublisher>,
    pub verified: mpsc::Sender<TxHash>,
}

impl VerifyingStage {
    pub async fn run(mut self, mut inputs: VerifyingInputs, mut shutdown: watch::Receiver<bool>) {
        info!(node = self.node, "[qr-02] verifying stage started");
        loop {
            let emitted = tokio::select! {
                maybe_entry = inputs.logs.recv() => {
                    let Some(entry) = maybe_entry else { break };
                    match self.state.on_log(&entry) {
                        Ok(emitted) => emitted,
                        Err(err) => {
                            error!(node = self.node, error = %err, "[qr-02] verifying dropped entry");
                            continue;
                        }
                    }
                }
                maybe_retired = inputs.retired.recv() => {
                    let Some(retired) = maybe_retired else { break };
                    self.state.on_retired(&retired);
                    self.state.scan()
                }
                Some(fired) = inputs.fired.recv() => {
                    if !self.timer.take_fired(&fired) {
                        continue;
                    }
                    self.defer(&fired.key).await;
                    self.state.scan()
                }
                _ = shutdown.changed() => break,
            };

            if !self.emit(emitted).await {
                break;
            }
            self.timer.sync(self.state.stalled_head().map(|(hash, _)| hash));
        }
        self.timer.cancel();
        debug!(node = self.node, pending = self.state.pending_len(), "[qr-02] verifying stage stopped");
    }

    async fn defer(&mut self, hash: &TxHash) {
        let Some(witnesses) = self.state.defer(hash) else {
            return;
        };
        warn!(
            node = self.node,
            hash = %hash.short(),
            witnesses,
            "[qr-02] gathering deferred head below quorum"
        );
        self.bus
            .publish(OrderingEvent::TransactionDeferred {
                node: self.node,
                tx_hash: hash.clone(),
                witnesses,
            })
            .await;
    }

    /// Returns `false` once graphing is gone.
    async fn emit(&mut self, emitted: Vec<TxHash>) -> bool {
        for tx_hash in emitted {
            debug!(node = self.node, hash = %tx_hash.short(), "[qr-02] hash verified");
            self.bus
                .publish(OrderingEvent::TxVerified {
                    node: self.node,
                    tx_hash: tx_hash.clone(),
                })
                .await;
            if self.verified.send(tx_hash).await.is_err() {
                debug!(node = self.node, "[qr-02] verified output closed, verifying stage exiting");
                return false;
            }
        }
        true
    }
}
