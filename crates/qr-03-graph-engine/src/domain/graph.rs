//! Index-based view of one finalized batch.

use super::errors::EngineError;
use serde::{Deserialize, Serialize};
use shared_types::{BatchSeq, FinalizedGraph, TxHash};
use std::collections::HashMap;

/// Lifecycle of a vertex during linearisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexState {
    Unvisited,
    /// On the Tarjan stack, DFN and low-link being computed.
    OnStack,
    /// Assigned to a strongly connected component.
    Assigned,
    /// Emitted in the final order.
    Retired,
}

/// Priority graph over one batch.
///
/// Vertices are the members sorted by ascending hash, so a vertex index
/// doubles as the deterministic tie-break key.
#[derive(Debug, Clone)]
pub struct PriorityGraph {
    batch_seq: BatchSeq,
    vertices: Vec<TxHash>,
    /// Successor lists, sorted and without duplicates.
    adjacency: Vec<Vec<usize>>,
    edge_count: usize,
}

impl PriorityGraph {
    pub fn from_finalized(graph: &FinalizedGraph) -> Result<Self, EngineError> {
        if graph.members.is_empty() {
            return Err(EngineError::EmptyBatch {
                batch_seq: graph.batch_seq,
            });
        }

        let vertices: Vec<TxHash> = graph.members.iter().cloned().collect();
        let index: HashMap<&TxHash, usize> = vertices
            .iter()
            .enumerate()
            .map(|(i, hash)| (hash, i))
            .collect();
        let lookup = |hash: &TxHash| {
            index
                .get(hash)
                .copied()
                .ok_or_else(|| EngineError::ForeignEdge {
                    batch_seq: graph.batch_seq,
                    hash: hash.clone(),
                })
        };

        let mut adjacency = vec![Vec::new(); vertices.len()];
        for edge in &graph.edges {
            let from = lookup(&edge.from)?;
            let to = lookup(&edge.to)?;
            if from != to {
                adjacency[from].push(to);
            }
        }
        let mut edge_count = 0;
        for successors in &mut adjacency {
            successors.sort_unstable();
            successors.dedup();
            edge_count += successors.len();
        }

        Ok(Self {
            batch_seq: graph.batch_seq,
            vertices,
            adjacency,
            edge_count,
        })
    }

    pub fn batch_seq(&self) -> BatchSeq {
        self.batch_seq
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn vertex(&self, index: usize) -> &TxHash {
        &self.vertices[index]
    }

    pub fn successors(&self, index: usize) -> &[usize] {
        &self.adjacency[index]
    }

    pub fn has_edge(&self, from: usize, to: usize) -> bool {
        self.adjacency[from].binary_search(&to).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::PriorityEdge;
    use std::collections::BTreeSet;

    fn finalized(members: &[&str], edges: &[(&str, &str)]) -> FinalizedGraph {
        FinalizedGraph {
            batch_seq: 1,
            members: members.iter().map(|m| TxHash::from(*m)).collect::<BTreeSet<_>>(),
            edges: edges
                .iter()
                .map(|(from, to)| PriorityEdge::new((*from).into(), (*to).into()))
                .collect(),
        }
    }

    #[test]
    fn test_vertices_sorted_by_hash() {
        let graph = PriorityGraph::from_finalized(&finalized(&["c", "a", "b"], &[])).unwrap();
        assert_eq!(graph.vertex(0), &TxHash::from("a"));
        assert_eq!(graph.vertex(2), &TxHash::from("c"));
    }

    #[test]
    fn test_duplicate_edges_collapsed() {
        let graph =
            PriorityGraph::from_finalized(&finalized(&["a", "b"], &[("a", "b"), ("a", "b")]))
                .unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edge(0, 1));
        assert!(!graph.has_edge(1, 0));
    }

    #[test]
    fn test_foreign_edge_rejected() {
        let err = PriorityGraph::from_finalized(&finalized(&["a"], &[("a", "z")])).unwrap_err();
        assert_eq!(
            err,
            EngineError::ForeignEdge {
                batch_seq: 1,
                hash: "z".into()
            }
        );
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(matches!(
            PriorityGraph::from_finalized(&finalized(&[], &[])),
            Err(EngineError::EmptyBatch { batch_seq: 1 })
        ));
    }
}
