//! Application layer: stage workers, liveness timers and the pipeline

mod graphing_stage;
mod paving_stage;
pub mod pipeline;
pub mod timer;
mod verifying_stage;

pub use pipeline::Pipeline;
pub use timer::{LivenessTimer, TimerFired};
