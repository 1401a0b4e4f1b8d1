//! Configuration for the sequencing subsystem

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SequencingConfig {
    /// Depth of each per-source inbox
    pub channel_capacity: usize,
    /// Reorder-cache size above which a source is logged as lagging
    pub max_pending_per_source: usize,
}

impl Default for SequencingConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
            max_pending_per_source: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SequencingConfig::default();
        assert_eq!(config.channel_capacity, 1000);
        assert_eq!(config.max_pending_per_source, 10_000);
    }
}
