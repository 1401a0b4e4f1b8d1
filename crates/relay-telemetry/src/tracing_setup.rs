//! Global subscriber installation.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{LogFormat, TelemetryConfig, TelemetryError};

/// Proof that the global subscriber is installed.
#[derive(Debug)]
pub struct TracingGuard {
    service: String,
    format: LogFormat,
}

impl TracingGuard {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }
}

pub(crate) fn build_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|e| TelemetryError::Filter(e.to_string()))
}

pub(crate) fn init_tracing(config: &TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    let filter = build_filter(&config.log_level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Off => registry.try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().compact().with_target(true))
            .try_init(),
    };
    installed.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    let service = config.full_service_name();
    tracing::info!(
        service = %service,
        filter = %config.log_level,
        format = ?config.format,
        "Logging initialized"
    );

    Ok(TracingGuard {
        service,
        format: config.format,
    })
}
