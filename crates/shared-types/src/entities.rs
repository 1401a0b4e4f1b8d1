//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `ReplicaId`, `ClientId`, `TxHash`
//! - **Sequencing**: `OrderedRequest`, `OrderedLogEntry`
//! - **Certification**: `PavedBatch`, `RetiredBatch`, `PriorityEdge`, `FinalizedGraph`
//! - **Execution**: `OrderedBatch`

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Identifier of a consensus replica (1-based).
pub type ReplicaId = u64;

/// Identifier of a proposing client.
pub type ClientId = u64;

/// Per-source sequence number (1-based, gapless once released).
pub type SequenceNumber = u64;

/// Monotonic batch counter shared by the certification stages.
pub type BatchSeq = u64;

/// Content hash naming a transaction.
///
/// Ordering is lexicographic on the hex string, which is what the graph
/// engine relies on for deterministic tie-breaks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First eight characters, for log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        self.0.get(..end).unwrap_or(&self.0)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxHash {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TxHash {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A raw transaction as proposed by a client.
///
/// The ordering core never looks inside the payload; it only orders hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub payload: Vec<u8>,
}

impl Transaction {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

// =============================================================================
// CLUSTER B: SEQUENCING
// =============================================================================

/// A client's numbered proposal of a list of transaction hashes.
///
/// Unique per `(client_id, sequence)`; `timestamp` is strictly increasing per
/// client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedRequest {
    pub client_id: ClientId,
    pub sequence: SequenceNumber,
    pub tx_hashes: Vec<TxHash>,
    pub timestamp: u64,
}

/// One transaction reference in a replica's local order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedLogEntry {
    pub replica_id: ReplicaId,
    pub sequence: SequenceNumber,
    pub tx_hash: TxHash,
    pub timestamp: u64,
}

// =============================================================================
// CLUSTER C: CERTIFICATION
// =============================================================================

/// A fixed-size set of distinct hashes read at agreed round-robin positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PavedBatch {
    pub batch_seq: BatchSeq,
    pub members: BTreeSet<TxHash>,
}

/// Garbage-collection signal sent by graphing once a batch is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetiredBatch {
    pub batch_seq: BatchSeq,
    pub members: BTreeSet<TxHash>,
}

/// `from` has priority over `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PriorityEdge {
    pub from: TxHash,
    pub to: TxHash,
}

impl PriorityEdge {
    pub fn new(from: TxHash, to: TxHash) -> Self {
        Self { from, to }
    }
}

/// Majority-certified relation over one batch.
///
/// `members` is carried alongside `edges` so that members whose pairs were all
/// left unordered still reach the graph engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedGraph {
    pub batch_seq: BatchSeq,
    pub members: BTreeSet<TxHash>,
    pub edges: Vec<PriorityEdge>,
}

impl FinalizedGraph {
    pub fn retired(&self) -> RetiredBatch {
        RetiredBatch {
            batch_seq: self.batch_seq,
            members: self.members.clone(),
        }
    }
}

// =============================================================================
// CLUSTER D: EXECUTION
// =============================================================================

/// Linear execution order for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedBatch {
    pub batch_seq: BatchSeq,
    pub order: Vec<TxHash>,
    /// Non-trivial strongly connected components that were collapsed, each
    /// listed in its tie-broken order.
    pub collapsed: Vec<Vec<TxHash>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_hash_ordering_is_lexicographic() {
        let mut hashes = vec![TxHash::from("c1"), TxHash::from("a9"), TxHash::from("b0")];
        hashes.sort();
        let expected: Vec<TxHash> = ["a9", "b0", "c1"].into_iter().map(TxHash::from).collect();
        assert_eq!(hashes, expected);
    }

    #[test]
    fn test_tx_hash_short() {
        let hash = TxHash::from("0123456789abcdef");
        assert_eq!(hash.short(), "01234567");
        assert_eq!(TxHash::from("ab").short(), "ab");
    }

    #[test]
    fn test_tx_hash_serializes_transparently() {
        let json = serde_json::to_string(&TxHash::from("deadbeef")).unwrap();
        assert_eq!(json, "\"deadbeef\"");
    }

    #[test]
    fn test_finalized_graph_retired_carries_members() {
        let members: BTreeSet<TxHash> = ["a", "b"].into_iter().map(TxHash::from).collect();
        let graph = FinalizedGraph {
            batch_seq: 7,
            members: members.clone(),
            edges: vec![PriorityEdge::new("a".into(), "b".into())],
        };
        let retired = graph.retired();
        assert_eq!(retired.batch_seq, 7);
        assert_eq!(retired.members, members);
    }
}
