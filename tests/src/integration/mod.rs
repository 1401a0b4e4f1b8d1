//! Cross-subsystem scenarios.

pub mod e2e_ordering;
pub mod liveness;
pub mod pipeline_flows;
