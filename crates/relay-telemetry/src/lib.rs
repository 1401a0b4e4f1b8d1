//! # Relay Telemetry
//!
//! Installs the process-wide `tracing` subscriber for Quorum-Relay binaries.
//! Every crate in the workspace logs through plain `tracing` macros; only
//! the binary calls [`init_telemetry`].
//!
//! ```rust,ignore
//! let _telemetry = relay_telemetry::init_telemetry(TelemetryConfig::from_env())?;
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TelemetryConfig};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber described by `config`.
///
/// Hold the returned guard until exit; dropping it logs the shutdown line.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let tracing = tracing_setup::init_tracing(&config)?;
    Ok(TelemetryGuard { tracing })
}

pub struct TelemetryGuard {
    tracing: TracingGuard,
}

impl TelemetryGuard {
    pub fn service(&self) -> &str {
        self.tracing.service()
    }

    pub fn format(&self) -> LogFormat {
        self.tracing.format()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.tracing.service(), "Logging shut down");
    }
}
