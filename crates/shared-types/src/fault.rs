//! # Fault Model
//!
//! Thresholds derived from the replica count N:
//!
//! - `f = max(1, ⌊(N-1)/4⌋)`
//! - `quorum = N - f`
//! - `majority = ⌊N/2⌋ + 1`

use crate::errors::FaultModelError;
use serde::{Deserialize, Serialize};

/// Smallest replica count with a non-empty quorum under the `f >= 1` floor.
pub const MIN_REPLICAS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultModel {
    n: usize,
    f: usize,
    quorum: usize,
    majority: usize,
}

impl FaultModel {
    pub fn new(n: usize) -> Result<Self, FaultModelError> {
        if n < MIN_REPLICAS {
            return Err(FaultModelError::TooFewReplicas {
                n,
                min: MIN_REPLICAS,
            });
        }
        let f = (n.saturating_sub(1) / 4).max(1);
        Ok(Self {
            n,
            f,
            quorum: n - f,
            majority: n / 2 + 1,
        })
    }

    /// Total replicas.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Tolerated faulty replicas.
    pub fn f(&self) -> usize {
        self.f
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn majority(&self) -> usize {
        self.majority
    }

    /// Replica ids `1..=N`.
    pub fn replicas(&self) -> impl Iterator<Item = u64> {
        1..=self.n as u64
    }

    pub fn is_known(&self, replica_id: u64) -> bool {
        replica_id >= 1 && replica_id <= self.n as u64
    }
}
