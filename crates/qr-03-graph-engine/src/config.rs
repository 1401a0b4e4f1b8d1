//! Configuration for the graph engine

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Finalized graphs held while an earlier batch is missing
    pub max_buffered_batches: usize,
    /// Depth of the engine inbox
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_buffered_batches: 64,
            channel_capacity: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_buffered_batches, 64);
        assert_eq!(config.channel_capacity, 1000);
    }

    #[test]
    fn test_config_serde() {
        let json = serde_json::to_string(&EngineConfig::default()).unwrap();
        let config: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.max_buffered_batches, 64);
    }
}
