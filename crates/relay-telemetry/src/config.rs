//! Logging configuration read from `QR_*` variables.

use std::env;

/// How log lines reach stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, coloured.
    Pretty,
    /// One JSON object per line.
    Json,
    /// Filter installed, nothing written.
    Off,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// Replica this process runs as; 0 when it hosts a whole cluster.
    pub node_id: u64,
    /// Level name or full `EnvFilter` directive.
    pub log_level: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "quorum-relay".to_string(),
            node_id: 0,
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl TelemetryConfig {
    /// Read from the process environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `QR_SERVICE_NAME` | `quorum-relay` |
    /// | `QR_NODE_ID` | `0` |
    /// | `QR_LOG_LEVEL`, then `RUST_LOG` | `info` |
    /// | `QR_LOG_FORMAT` (`pretty`, `json`, `off`) | `json` inside a container, else `pretty` |
    /// | `QR_JSON_LOGS` (legacy boolean) | unset |
    pub fn from_env() -> Self {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) over any variable source.
    ///
    /// Logging must come up even when misconfigured, so unparsable values
    /// fall back to defaults instead of failing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let in_container = lookup("KUBERNETES_SERVICE_HOST").is_some()
            || lookup("DOCKER_CONTAINER").is_some();

        let format = lookup("QR_LOG_FORMAT")
            .and_then(|value| parse_format(&value))
            .or_else(|| {
                lookup("QR_JSON_LOGS").map(|value| {
                    if parse_flag(&value) {
                        LogFormat::Json
                    } else {
                        LogFormat::Pretty
                    }
                })
            })
            .unwrap_or(if in_container {
                LogFormat::Json
            } else {
                defaults.format
            });

        Self {
            service_name: lookup("QR_SERVICE_NAME").unwrap_or(defaults.service_name),
            node_id: lookup("QR_NODE_ID")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(defaults.node_id),
            log_level: lookup("QR_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            format,
        }
    }

    #[must_use]
    pub fn with_node(mut self, node_id: u64) -> Self {
        self.node_id = node_id;
        self
    }

    /// `quorum-relay-3` for replica 3, the bare name for node 0.
    pub fn full_service_name(&self) -> String {
        match self.node_id {
            0 => self.service_name.clone(),
            id => format!("{}-{}", self.service_name, id),
        }
    }
}

fn parse_format(value: &str) -> Option<LogFormat> {
    match value.trim().to_ascii_lowercase().as_str() {
        "pretty" | "text" => Some(LogFormat::Pretty),
        "json" => Some(LogFormat::Json),
        "off" | "none" => Some(LogFormat::Off),
        _ => None,
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
