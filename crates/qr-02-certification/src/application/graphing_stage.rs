//! Graphing stage worker.
//!
//! Selects over replica log entries, paved batches and verified hashes.
//! Every finalized graph is announced, then retired in paving and
//! verifying, then handed to the graph engine. Withdrawn members go back to
//! paving for a re-pave and to verifying to be forgotten.

use crate::algorithms::{GraphingState, GraphingWait};
use crate::application::timer::{LivenessTimer, TimerFired};
use crate::domain::Withdrawal;
use shared_bus::{EventPublisher, LivenessStage, OrderingEvent};
use shared_types::{BatchSeq, FinalizedGraph, OrderedLogEntry, PavedBatch, ReplicaId, RetiredBatch, TxHash};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

pub(crate) struct GraphingInputs {
    pub logs: mpsc::Receiver<OrderedLogEntry>,
    pub batches: mpsc::Receiver<PavedBatch>,
    pub verified: mpsc::Receiver<TxHash>,
    pub fired: mpsc::Receiver<TimerFired<GraphingWait>>,
}

pub(crate) struct GraphingOutputs {
    pub graphs: mpsc::Sender<FinalizedGraph>,
    pub retire_paving: mpsc::Sender<RetiredBatch>,
    pub retire_verifying: mpsc::Sender<RetiredBatch>,
    pub withdraw_paving: mpsc::Sender<Withdrawal>,
}

pub(crate) struct GraphingStage {
    pub node: ReplicaId,
    pub state: GraphingState,
    pub timer: LivenessTimer<GraphingWait>,
    pub bus: Arc<dyn EventPublisher>,
    pub outputs: GraphingOutputs,
}

impl GraphingStage {
    pub async fn run(mut self, mut inputs: GraphingInputs, mut shutdown: watch::Receiver<bool>) {
        info!(node = self.node, "[qr-02] graphing stage started");
        loop {
            let finalized = tokio::select! {
                maybe_entry = inputs.logs.recv() => {
                    let Some(entry) = maybe_entry else { break };
                    match self.state.on_log(&entry) {
                        Ok(finalized) => finalized,
                        Err(err) => {
                            error!(node = self.node, error = %err, "[qr-02] graphing dropped entry");
                            continue;
                        }
                    }
                }
                maybe_batch = inputs.batches.recv() => {
                    let Some(batch) = maybe_batch else { break };
                    match self.state.on_paved(batch) {
                        Ok(finalized) => finalized,
                        Err(err) => {
                            warn!(node = self.node, error = %err, "[qr-02] graphing dropped batch");
                            continue;
                        }
                    }
                }
                maybe_hash = inputs.verified.recv() => {
                    let Some(hash) = maybe_hash else { break };
                    self.state.on_verified(hash)
                }
                Some(fired) = inputs.fired.recv() => {
                    if !self.timer.take_fired(&fired) {
                        continue;
                    }
                    match fired.key {
                        GraphingWait::Pair(batch_seq) => self.appoint(batch_seq).await,
                        GraphingWait::Members(batch_seq) => {
                            if !self.withdraw(batch_seq).await {
                                break;
                            }
                        }
                    }
                    self.state.progress()
                }
                _ = shutdown.changed() => break,
            };

            if !self.finish(finalized).await {
                break;
            }
            self.timer.sync(self.state.waiting());
        }
        self.timer.cancel();
        debug!(node = self.node, expected = self.state.expected_seq(), "[qr-02] graphing stage stopped");
    }

    async fn appoint(&mut self, batch_seq: BatchSeq) {
        let pair = self.state.blocked_pair().cloned();
        let suspects = self.state.relax(batch_seq);
        if let Some(pair) = pair {
            warn!(
                node = self.node,
                batch_seq,
                from = %pair.from.short(),
                to = %pair.to.short(),
                suspects = suspects.len(),
                "[qr-02] appointing relaxed pair completion to quorum"
            );
        }
        for suspect in suspects {
            self.bus
                .publish(OrderingEvent::ReplicaSuspected {
                    node: self.node,
                    suspect,
                    stage: LivenessStage::Appointing,
                })
                .await;
        }
    }

    /// Returns `false` once paving or verifying is gone.
    async fn withdraw(&mut self, batch_seq: BatchSeq) -> bool {
        let Some(withdrawal) = self.state.withdraw_unverified(batch_seq) else {
            return true;
        };
        warn!(
            node = self.node,
            batch_seq,
            withdrawn = withdrawal.hashes.len(),
            suspects = withdrawal.reporters.len(),
            "[qr-02] withdrawing members below quorum witness"
        );
        for suspect in &withdrawal.reporters {
            self.bus
                .publish(OrderingEvent::ReplicaSuspected {
                    node: self.node,
                    suspect: *suspect,
                    stage: LivenessStage::Gathering,
                })
                .await;
        }
        let forgotten = withdrawal.forgotten();
        if self.outputs.retire_verifying.send(forgotten).await.is_err()
            || self.outputs.withdraw_paving.send(withdrawal).await.is_err()
        {
            debug!(node = self.node, "[qr-02] graphing output closed, stage exiting");
            return false;
        }
        true
    }

    /// Returns `false` once a downstream consumer is gone.
    async fn finish(&mut self, finalized: Vec<FinalizedGraph>) -> bool {
        for graph in finalized {
            self.bus
                .publish(OrderingEvent::BatchFinalized {
                    node: self.node,
                    graph: graph.clone(),
                })
                .await;

            let retired = graph.retired();
            let delivered = self.outputs.retire_paving.send(retired.clone()).await.is_ok()
                && self.outputs.retire_verifying.send(retired).await.is_ok()
                && self.outputs.graphs.send(graph).await.is_ok();
            if !delivered {
                debug!(node = self.node, "[qr-02] graphing output closed, stage exiting");
                return false;
            }
        }
        true
    }
}
