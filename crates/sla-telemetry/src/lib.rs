//! # SLA Telemetry
//!
//! Logging and metrics for the Shelter Lifeline Aid services.
//!
//! ## Components
//!
//! - **Logs**: `tracing` events rendered by `tracing-subscriber`, pretty for
//!   development and JSON for log shippers.
//! - **Metrics**: Prometheus counters and histograms owned by a
//!   [`LifecycleMetrics`] instance. There is no global registry; the host
//!   process decides where the text exposition is served.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sla_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let guard = init_telemetry(TelemetryConfig::from_env())?;
//! let metrics = guard.metrics();
//! // hand `metrics` to the lifecycle service
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SLA_SERVICE_NAME` | `sla-case-lifecycle` | Service name attached to logs |
//! | `SLA_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `SLA_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `SLA_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `SLA_ENVIRONMENT` | `development` | Deployment environment tag |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{LifecycleMetrics, OperationTimer};

use std::sync::Arc;
use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize log subscriber: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and create the metrics set.
///
/// Returns a guard holding the metrics. Keep it for the process lifetime.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = Arc::new(LifecycleMetrics::new()?);
    init_logging(&config)?;

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        json = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { config, metrics })
}

/// Keeps telemetry state alive.
pub struct TelemetryGuard {
    config: TelemetryConfig,
    metrics: Arc<LifecycleMetrics>,
}

impl TelemetryGuard {
    #[must_use]
    pub fn metrics(&self) -> Arc<LifecycleMetrics> {
        Arc::clone(&self.metrics)
    }

    #[must_use]
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.config.service_name, "Shutting down telemetry");
    }
}
