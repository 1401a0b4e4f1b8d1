//! Tarjan's strongly connected components, iterative.
//!
//! The DFS keeps its own call stack of `(vertex, next successor)` frames, so
//! memory is bounded by the batch size rather than the thread stack.

use crate::domain::{PriorityGraph, VertexState};

struct Frame {
    vertex: usize,
    next: usize,
}

/// Components of `graph`, in reverse topological order of the condensation.
///
/// Members of each component are sorted by vertex index. `states` ends with
/// every vertex [`VertexState::Assigned`].
pub fn strongly_connected_components(
    graph: &PriorityGraph,
    states: &mut Vec<VertexState>,
) -> Vec<Vec<usize>> {
    let n = graph.len();
    states.clear();
    states.resize(n, VertexState::Unvisited);

    let mut dfn = vec![0usize; n];
    let mut low = vec![0usize; n];
    let mut counter = 0usize;
    let mut stack: Vec<usize> = Vec::new();
    let mut calls: Vec<Frame> = Vec::new();
    let mut components = Vec::new();

    for root in 0..n {
        if states[root] != VertexState::Unvisited {
            continue;
        }

        counter += 1;
        dfn[root] = counter;
        low[root] = counter;
        states[root] = VertexState::OnStack;
        stack.push(root);
        calls.push(Frame {
            vertex: root,
            next: 0,
        });

        while let Some(frame) = calls.last_mut() {
            let v = frame.vertex;
            if let Some(&w) = graph.successors(v).get(frame.next) {
                frame.next += 1;
                match states[w] {
                    VertexState::Unvisited => {
                        counter += 1;
                        dfn[w] = counter;
                        low[w] = counter;
                        states[w] = VertexState::OnStack;
                        stack.push(w);
                        calls.push(Frame { vertex: w, next: 0 });
                    }
                    VertexState::OnStack => low[v] = low[v].min(dfn[w]),
                    VertexState::Assigned | VertexState::Retired => {}
                }
                continue;
            }

            calls.pop();
            if let Some(parent) = calls.last() {
                low[parent.vertex] = low[parent.vertex].min(low[v]);
            }
            if low[v] == dfn[v] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    states[member] = VertexState::Assigned;
                    component.push(member);
                    if member == v {
                        break;
                    }
                }
                component.sort_unstable();
                components.push(component);
            }
        }
    }
    components
}
