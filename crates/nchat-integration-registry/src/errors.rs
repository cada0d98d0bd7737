//! Error types for the integration registry.

use nchat_credential_vault::VaultError;
use nchat_types::InstallationId;
use thiserror::Error;

/// Errors raised while installing, updating, or removing an integration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No catalog entry exists for the requested connector type.
    #[error("unknown connector type: {0}")]
    UnknownConnectorType(String),

    /// No installation is registered under the given ID.
    #[error("unknown installation: {0}")]
    UnknownInstallation(InstallationId),

    /// The credential vault failed to store or retrieve a credential.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    /// The connector rejected the supplied config/credentials on connect.
    #[error("connector authentication failed: {0}")]
    AuthError(String),

    /// Reconfiguring a connected installation failed.
    #[error("connector reconfiguration failed: {0}")]
    ConfigError(String),

    /// The requested operation requires a different lifecycle state, e.g.
    /// enabling an installation that isn't disabled.
    #[error("installation {0} is not in a state that allows this operation")]
    InvalidState(InstallationId),
}
