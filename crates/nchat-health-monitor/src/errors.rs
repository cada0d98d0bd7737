//! Error types for the health monitor.

use thiserror::Error;

/// Errors raised by the health monitor.
#[derive(Debug, Error)]
pub enum HealthMonitorError {
    /// No installation is registered under the given ID.
    #[error("no installation registered: {0}")]
    UnknownInstallation(nchat_types::InstallationId),
}
