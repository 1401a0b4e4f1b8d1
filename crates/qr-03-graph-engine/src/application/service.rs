//! Graph Engine Service
//!
//! Orchestrates linearisation:
//! 1. Validate the finalized graph
//! 2. Buffer it until every earlier batch has been ordered
//! 3. Collapse cycles and sort the condensation
//! 4. Hand the order to every registered callback

use crate::algorithms::linearize;
use crate::config::EngineConfig;
use crate::domain::{EngineError, PriorityGraph};
use shared_types::{BatchSeq, FinalizedGraph, OrderedBatch, ReplicaId, TxHash};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Receives `(batch_seq, ordered hashes)` for every ordered batch.
pub type FinalizedOrderCallback = Box<dyn Fn(BatchSeq, &[TxHash]) + Send + Sync>;

pub struct GraphEngine {
    node: ReplicaId,
    config: EngineConfig,
    next_seq: BatchSeq,
    buffered: BTreeMap<BatchSeq, PriorityGraph>,
    callbacks: Vec<FinalizedOrderCallback>,
}

impl GraphEngine {
    pub fn new(node: ReplicaId, config: EngineConfig) -> Self {
        Self {
            node,
            config,
            next_seq: 1,
            buffered: BTreeMap::new(),
            callbacks: Vec::new(),
        }
    }

    pub fn on_finalized_order<F>(&mut self, callback: F)
    where
        F: Fn(BatchSeq, &[TxHash]) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Accept a finalized graph in any order; returns every batch that
    /// became orderable, ascending.
    pub fn accept(&mut self, graph: FinalizedGraph) -> Result<Vec<OrderedBatch>, EngineError> {
        if graph.batch_seq < self.next_seq || self.buffered.contains_key(&graph.batch_seq) {
            return Err(EngineError::StaleBatch {
                batch_seq: graph.batch_seq,
                next: self.next_seq,
            });
        }
        if graph.batch_seq > self.next_seq && self.buffered.len() >= self.config.max_buffered_batches
        {
            return Err(EngineError::BufferFull {
                max: self.config.max_buffered_batches,
            });
        }

        let priority = PriorityGraph::from_finalized(&graph)?;
        self.buffered.insert(graph.batch_seq, priority);
        if graph.batch_seq > self.next_seq {
            debug!(
                node = self.node,
                batch_seq = graph.batch_seq,
                next = self.next_seq,
                "[qr-03] buffered early batch"
            );
        }
        Ok(self.drain())
    }

    fn drain(&mut self) -> Vec<OrderedBatch> {
        let mut ordered = Vec::new();
        while let Some(graph) = self.buffered.remove(&self.next_seq) {
            let batch = linearize(&graph);
            info!(
                node = self.node,
                batch_seq = batch.batch_seq,
                members = batch.order.len(),
                edges = graph.edge_count(),
                collapsed = batch.collapsed.len(),
                "[qr-03] batch ordered"
            );
            for callback in &self.callbacks {
                callback(batch.batch_seq, &batch.order);
            }
            self.next_seq += 1;
            ordered.push(batch);
        }
        ordered
    }

    pub fn node(&self) -> ReplicaId {
        self.node
    }

    pub fn next_seq(&self) -> BatchSeq {
        self.next_seq
    }

    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }
}
