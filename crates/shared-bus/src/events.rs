//! # Ordering Events
//!
//! Closed set of notifications that flow through the shared bus.
//! Every event names the replica (`node`) whose pipeline produced it, so one
//! bus can serve several in-process replicas.

use serde::{Deserialize, Serialize};
use shared_types::{BatchSeq, FinalizedGraph, OrderedBatch, PavedBatch, ReplicaId, TxHash};

/// Which liveness window expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LivenessStage {
    /// A paving row was missing cells past the delay.
    Paving,
    /// A verifying head stayed below quorum past the delay.
    Gathering,
    /// A graphing pair stayed undetermined past the delay.
    Appointing,
}

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderingEvent {
    // =========================================================================
    // SUBSYSTEM 2: CERTIFICATION
    // =========================================================================
    /// Paving assembled a batch of distinct hashes.
    BatchPaved { node: ReplicaId, batch: PavedBatch },

    /// A hash reached quorum witness.
    TxVerified { node: ReplicaId, tx_hash: TxHash },

    /// Graphing resolved every pair of a batch.
    BatchFinalized { node: ReplicaId, graph: FinalizedGraph },

    /// Paving and verifying dropped every trace of a finalized batch.
    BatchRetired { node: ReplicaId, batch_seq: BatchSeq },

    // =========================================================================
    // SUBSYSTEM 3: GRAPH ENGINE
    // =========================================================================
    /// A batch was linearised for execution.
    BatchOrdered { node: ReplicaId, batch: OrderedBatch },

    // =========================================================================
    // LIVENESS
    // =========================================================================
    /// A replica failed to provide evidence within a liveness window.
    ReplicaSuspected {
        node: ReplicaId,
        suspect: ReplicaId,
        stage: LivenessStage,
    },

    /// A verifying head was moved behind its successors.
    TransactionDeferred {
        node: ReplicaId,
        tx_hash: TxHash,
        witnesses: usize,
    },
}

impl OrderingEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::BatchPaved { .. } => EventTopic::Paving,
            Self::TxVerified { .. } => EventTopic::Verifying,
            Self::BatchFinalized { .. } | Self::BatchRetired { .. } => EventTopic::Graphing,
            Self::BatchOrdered { .. } => EventTopic::Engine,
            Self::ReplicaSuspected { .. } | Self::TransactionDeferred { .. } => {
                EventTopic::Liveness
            }
        }
    }

    /// The replica whose pipeline emitted this event.
    #[must_use]
    pub fn node(&self) -> ReplicaId {
        match self {
            Self::BatchPaved { node, .. }
            | Self::TxVerified { node, .. }
            | Self::BatchFinalized { node, .. }
            | Self::BatchRetired { node, .. }
            | Self::BatchOrdered { node, .. }
            | Self::ReplicaSuspected { node, .. }
            | Self::TransactionDeferred { node, .. } => *node,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Paving,
    Verifying,
    Graphing,
    Engine,
    Liveness,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Emitting replicas to include. Empty means all replicas.
    pub nodes: Vec<ReplicaId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            nodes: Vec::new(),
        }
    }

    /// Create a filter for events emitted by specific replicas.
    #[must_use]
    pub fn from_nodes(nodes: Vec<ReplicaId>) -> Self {
        Self {
            topics: Vec::new(),
            nodes,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &OrderingEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let node_match = self.nodes.is_empty() || self.nodes.contains(&event.node());

        topic_match && node_match
    }
}
