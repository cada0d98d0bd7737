//! # nchat-telemetry
//!
//! Structured logging and in-process metrics for the nchat node.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nchat_telemetry::{TelemetryConfig, init_tracing};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_tracing(&config).expect("failed to init tracing");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NCHAT_SERVICE_NAME` | `nchat-node` | Service name attached to logs |
//! | `NCHAT_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `NCHAT_CONSOLE_OUTPUT` | `true` | Enable console output |
//! | `NCHAT_JSON_LOGS` | `false` (`true` in containers) | JSON-formatted logs |

#![warn(missing_docs)]

mod config;
mod logging;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{Metrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use tracing_setup::{init_tracing, TracingGuard};

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// `tracing-subscriber` failed to install a global subscriber.
    #[error("failed to initialize tracing: {0}")]
    TracerInit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_name_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "nchat-node");
    }
}
