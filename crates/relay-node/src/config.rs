//! # Node Configuration
//!
//! One flat struct covering the in-process cluster, read from `QR_*`
//! environment variables. Unset variables keep their defaults; a set but
//! unparsable variable is an error rather than a silent fallback.

use qr_01_sequencing::SequencingConfig;
use qr_02_certification::{CertificationConfig, CertificationError};
use qr_03_graph_engine::EngineConfig;
use shared_types::FaultModel;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Id reported by telemetry for this process.
    pub node_id: u64,
    /// Replicas in the cluster (N).
    pub replica_count: usize,
    /// Distinct hashes per paved batch (K).
    pub batch_capacity: usize,
    /// Wait before a stalled stage degrades to quorum.
    pub liveness_delay: Duration,
    /// Depth of every inbox in the cluster.
    pub channel_capacity: usize,
    /// Simulated clients.
    pub sim_clients: usize,
    /// Transactions each simulated client proposes.
    pub sim_txs: usize,
    /// Upper bound of the random delay added to each delivery.
    pub jitter: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: 0,
            replica_count: 4,
            batch_capacity: 5,
            liveness_delay: Duration::from_secs(6),
            channel_capacity: 1000,
            sim_clients: 2,
            sim_txs: 10,
            jitter: Duration::ZERO,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable set to something that does not parse.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    /// Values parse but do not form a usable cluster.
    #[error("Invalid cluster configuration: {0}")]
    Cluster(#[from] CertificationError),
}

impl NodeConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            node_id: parse(&lookup, "QR_NODE_ID", defaults.node_id)?,
            replica_count: parse(&lookup, "QR_REPLICA_COUNT", defaults.replica_count)?,
            batch_capacity: parse(&lookup, "QR_BATCH_CAPACITY", defaults.batch_capacity)?,
            liveness_delay: Duration::from_millis(parse(
                &lookup,
                "QR_LIVENESS_DELAY_MS",
                defaults.liveness_delay.as_millis() as u64,
            )?),
            channel_capacity: parse(&lookup, "QR_CHANNEL_CAPACITY", defaults.channel_capacity)?,
            sim_clients: parse(&lookup, "QR_SIM_CLIENTS", defaults.sim_clients)?,
            sim_txs: parse(&lookup, "QR_SIM_TXS", defaults.sim_txs)?,
            jitter: Duration::from_millis(parse(
                &lookup,
                "QR_SIM_JITTER_MS",
                defaults.jitter.as_millis() as u64,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<FaultModel, ConfigError> {
        Ok(self.certification().validate()?)
    }

    pub fn certification(&self) -> CertificationConfig {
        CertificationConfig {
            replica_count: self.replica_count,
            batch_capacity: self.batch_capacity,
            liveness_delay: self.liveness_delay,
            channel_capacity: self.channel_capacity,
            ..CertificationConfig::default()
        }
    }

    pub fn sequencing(&self) -> SequencingConfig {
        SequencingConfig {
            channel_capacity: self.channel_capacity,
            ..SequencingConfig::default()
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            channel_capacity: self.channel_capacity,
            ..EngineConfig::default()
        }
    }

    /// Full batches the simulated load produces. A trailing partial batch
    /// never fills, so it is not counted.
    pub fn expected_batches(&self) -> u64 {
        if self.batch_capacity == 0 {
            return 0;
        }
        ((self.sim_clients * self.sim_txs) / self.batch_capacity) as u64
    }
}

fn parse<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = NodeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.replica_count, 4);
        assert_eq!(config.batch_capacity, 5);
        assert_eq!(config.liveness_delay, Duration::from_secs(6));
        assert_eq!(config.expected_batches(), 4);
    }

    #[test]
    fn test_overrides_applied() {
        let config = NodeConfig::from_lookup(lookup(&[
            ("QR_NODE_ID", "7"),
            ("QR_REPLICA_COUNT", "7"),
            ("QR_LIVENESS_DELAY_MS", "250"),
            ("QR_SIM_CLIENTS", "3"),
            ("QR_SIM_TXS", "4"),
            ("QR_SIM_JITTER_MS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.node_id, 7);
        assert_eq!(config.validate().unwrap().f(), 1);
        assert_eq!(config.liveness_delay, Duration::from_millis(250));
        assert_eq!(config.jitter, Duration::from_millis(5));
        assert_eq!(config.expected_batches(), 2);
        assert_eq!(config.certification().replica_count, 7);
    }

    #[test]
    fn test_unparsable_value_rejected() {
        let err = NodeConfig::from_lookup(lookup(&[("QR_BATCH_CAPACITY", "five")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "QR_BATCH_CAPACITY",
                ..
            }
        ));
    }

    #[test]
    fn test_single_replica_rejected() {
        let err = NodeConfig::from_lookup(lookup(&[("QR_REPLICA_COUNT", "1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Cluster(_)));
    }
}
