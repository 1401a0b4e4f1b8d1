//! Kahn's topological sort over the SCC condensation.
//!
//! O(V + E). Components with zero in-degree are released layer by layer;
//! each layer is sorted by its smallest member so the result depends only
//! on the edge set.

use crate::domain::PriorityGraph;
use std::collections::BTreeSet;

/// Order `components` of `graph` so every cross-component edge points
/// forward. Returns component indices.
pub fn kahns_condensation_order(graph: &PriorityGraph, components: &[Vec<usize>]) -> Vec<usize> {
    if components.is_empty() {
        return Vec::new();
    }

    // 1. Map vertices to components
    let mut component_of = vec![0usize; graph.len()];
    for (index, component) in components.iter().enumerate() {
        for &vertex in component {
            component_of[vertex] = index;
        }
    }

    // 2. Condensed adjacency and in-degree
    let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
    for vertex in 0..graph.len() {
        let from = component_of[vertex];
        for &successor in graph.successors(vertex) {
            let to = component_of[successor];
            if from != to {
                adjacency[from].insert(to);
            }
        }
    }
    let mut in_degree = vec![0usize; components.len()];
    for successors in &adjacency {
        for &to in successors {
            in_degree[to] += 1;
        }
    }

    // Smallest member is the component's sort key; members are sorted.
    let key = |component: &usize| components[*component].first().copied().unwrap_or(usize::MAX);

    // 3. Layered release
    let mut queue: Vec<usize> = (0..components.len())
        .filter(|&c| in_degree[c] == 0)
        .collect();
    queue.sort_by_key(key);

    let mut order = Vec::with_capacity(components.len());
    while !queue.is_empty() {
        let layer = std::mem::take(&mut queue);
        let mut next_queue = Vec::new();
        for &component in &layer {
            for &successor in &adjacency[component] {
                in_degree[successor] = in_degree[successor].saturating_sub(1);
                if in_degree[successor] == 0 {
                    next_queue.push(successor);
                }
            }
        }
        order.extend(layer);

        next_queue.sort_by_key(key);
        queue = next_queue;
    }

    // The condensation is acyclic, so every component is released.
    debug_assert_eq!(order.len(), components.len());
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{FinalizedGraph, PriorityEdge, TxHash};

    fn graph(members: &[&str], edges: &[(&str, &str)]) -> PriorityGraph {
        PriorityGraph::from_finalized(&FinalizedGraph {
            batch_seq: 1,
            members: members.iter().map(|m| TxHash::from(*m)).collect(),
            edges: edges
                .iter()
                .map(|(from, to)| PriorityEdge::new((*from).into(), (*to).into()))
                .collect(),
        })
        .unwrap()
    }

    fn singletons(n: usize) -> Vec<Vec<usize>> {
        (0..n).map(|v| vec![v]).collect()
    }

    /// A → B → C (simple chain)
    #[test]
    fn test_kahns_simple_chain() {
        let g = graph(&["a", "b", "c"], &[("c", "b"), ("b", "a")]);
        assert_eq!(kahns_condensation_order(&g, &singletons(3)), vec![2, 1, 0]);
    }

    /// No edges: hash order
    #[test]
    fn test_kahns_independent_members() {
        let g = graph(&["c", "a", "b"], &[]);
        assert_eq!(kahns_condensation_order(&g, &singletons(3)), vec![0, 1, 2]);
    }

    /// Diamond graph
    ///     D
    ///    / \
    ///   B   C
    ///    \ /
    ///     A
    #[test]
    fn test_kahns_diamond_graph() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("d", "b"), ("d", "c"), ("b", "a"), ("c", "a")],
        );
        assert_eq!(
            kahns_condensation_order(&g, &singletons(4)),
            vec![3, 1, 2, 0]
        );
    }

    #[test]
    fn test_kahns_collapsed_component() {
        // {a, b} is one unit; c must come first.
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "a"), ("c", "a")]);
        let components = vec![vec![0, 1], vec![2]];
        assert_eq!(kahns_condensation_order(&g, &components), vec![1, 0]);
    }

    #[test]
    fn test_empty_components() {
        let g = graph(&["a"], &[]);
        assert!(kahns_condensation_order(&g, &[]).is_empty());
    }
}
