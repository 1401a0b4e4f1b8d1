//! Domain layer for the graph engine

pub mod errors;
pub mod graph;

pub use errors::EngineError;
pub use graph::{PriorityGraph, VertexState};
