//! Strict execution order for one batch.

use super::kahns::kahns_condensation_order;
use super::tarjan::strongly_connected_components;
use crate::domain::{PriorityGraph, VertexState};
use shared_types::OrderedBatch;

/// Collapse cycles and order the condensation.
///
/// Each collapsed unit is emitted in ascending hash order. The result is a
/// pure function of the member set and the edge set.
pub fn linearize(graph: &PriorityGraph) -> OrderedBatch {
    let mut states = Vec::with_capacity(graph.len());
    let components = strongly_connected_components(graph, &mut states);
    let component_order = kahns_condensation_order(graph, &components);

    let mut order = Vec::with_capacity(graph.len());
    let mut collapsed = Vec::new();
    for index in component_order {
        let component = &components[index];
        let hashes: Vec<_> = component
            .iter()
            .map(|&vertex| {
                states[vertex] = VertexState::Retired;
                graph.vertex(vertex).clone()
            })
            .collect();
        if hashes.len() > 1 {
            collapsed.push(hashes.clone());
        }
        order.extend(hashes);
    }
    debug_assert!(states.iter().all(|state| *state == VertexState::Retired));

    OrderedBatch {
        batch_seq: graph.batch_seq(),
        order,
        collapsed,
    }
}
