//! # Graph Engine Subsystem (qr-03)
//!
//! Reduces each finalized priority graph to a strict execution order.
//!
//! Pairwise majority is not transitive, so a batch may contain cycles such
//! as A→B→C→A. The engine collapses every strongly connected component into
//! one unit ordered by ascending hash, then topologically sorts the
//! condensation with Kahn's algorithm. Every correct replica derives the same
//! order from the same edge set.
//!
//! ## Architecture
//!
//! - **Domain**: `PriorityGraph`, `VertexState`
//! - **Algorithms**: iterative Tarjan, Kahn over the condensation, `linearize`
//! - **Application**: `GraphEngine` (reorder buffer and callbacks), `run_engine`,
//!   `EngineHandle` (idempotent start and stop of the worker)

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;

pub use algorithms::{kahns_condensation_order, linearize, strongly_connected_components};
pub use application::{run_engine, EngineHandle, FinalizedOrderCallback, GraphEngine};
pub use config::EngineConfig;
pub use domain::{EngineError, PriorityGraph, VertexState};
