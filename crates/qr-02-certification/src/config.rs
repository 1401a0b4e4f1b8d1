//! Configuration for the certification pipeline

use crate::domain::errors::CertificationError;
use serde::{Deserialize, Serialize};
use shared_types::FaultModel;
use std::time::Duration;

/// Batches a tombstone outlives a replica that never reports its hash.
pub const DEFAULT_TOMBSTONE_WINDOW: u64 = 64;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CertificationConfig {
    /// Total replicas N
    pub replica_count: usize,
    /// Distinct hashes per paved batch (K)
    pub batch_capacity: usize,
    /// Wait before a stalled paving row, verifying head or graphing pair
    /// degrades to quorum
    pub liveness_delay: Duration,
    /// Depth of every stage inbox
    pub channel_capacity: usize,
    /// Batches a retired hash stays tombstoned when some replica never
    /// reports it
    pub tombstone_window: u64,
}

impl Default for CertificationConfig {
    fn default() -> Self {
        Self {
            replica_count: 4,
            batch_capacity: 5,
            liveness_delay: Duration::from_secs(6),
            channel_capacity: 1000,
            tombstone_window: DEFAULT_TOMBSTONE_WINDOW,
        }
    }
}

impl CertificationConfig {
    pub fn fault_model(&self) -> Result<FaultModel, CertificationError> {
        FaultModel::new(self.replica_count).map_err(CertificationError::from)
    }

    pub fn validate(&self) -> Result<FaultModel, CertificationError> {
        if self.batch_capacity == 0 {
            return Err(CertificationError::InvalidConfig(
                "batch_capacity must be at least 1".to_string(),
            ));
        }
        if self.tombstone_window == 0 {
            return Err(CertificationError::InvalidConfig(
                "tombstone_window must be at least 1".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(CertificationError::InvalidConfig(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        self.fault_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CertificationConfig::default();
        assert_eq!(config.batch_capacity, 5);
        assert_eq!(config.liveness_delay, Duration::from_secs(6));
        assert_eq!(config.channel_capacity, 1000);
        assert_eq!(config.tombstone_window, 64);

        let model = config.validate().unwrap();
        assert_eq!(model.quorum(), 3);
        assert_eq!(model.majority(), 3);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = CertificationConfig {
            batch_capacity: 0,
            ..CertificationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CertificationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_single_replica_rejected() {
        let config = CertificationConfig {
            replica_count: 1,
            ..CertificationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CertificationError::FaultModel(_))
        ));
    }
}
