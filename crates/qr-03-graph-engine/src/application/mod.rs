//! Application layer: engine service and its worker

pub mod handle;
pub mod service;
pub mod worker;

pub use handle::EngineHandle;
pub use service::{FinalizedOrderCallback, GraphEngine};
pub use worker::run_engine;
