//! # Error Types
//!
//! Errors raised while building shared values.

use thiserror::Error;

/// Errors from deriving a fault model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultModelError {
    /// Too few replicas for any quorum to exist.
    #[error("Replica count too small: {n} < {min}")]
    TooFewReplicas { n: usize, min: usize },
}
