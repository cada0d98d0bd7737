//! Unified configuration for the node's subsystems.

use std::env;

/// Complete node configuration, assembled from environment variables with
/// sane defaults for local development.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Structured logging configuration.
    pub telemetry: nchat_telemetry::TelemetryConfig,
    /// Credential vault configuration.
    pub security: SecurityConfig,
    /// Health monitor configuration.
    pub health: nchat_health_monitor::HealthMonitorConfig,
}

impl NodeConfig {
    /// Build configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            telemetry: nchat_telemetry::TelemetryConfig::from_env(),
            security: SecurityConfig::from_env(),
            health: nchat_health_monitor::HealthMonitorConfig::default(),
        }
    }

    /// Refuse to start against plaintext credential storage unless the
    /// operator opted in explicitly.
    ///
    /// # Panics
    ///
    /// Panics if no vault encryption key is configured and
    /// `NCHAT_ALLOW_PLAINTEXT_VAULT` was not set.
    pub fn validate_for_production(&self) {
        if self.security.vault_encryption_key.is_none() && !self.security.allow_plaintext_vault {
            panic!(
                "SECURITY VIOLATION: no vault encryption key configured. \
                 Set NCHAT_VAULT_KEY (32 bytes, hex-encoded) or NCHAT_ALLOW_PLAINTEXT_VAULT=true for local development."
            );
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            telemetry: nchat_telemetry::TelemetryConfig::default(),
            security: SecurityConfig::default(),
            health: nchat_health_monitor::HealthMonitorConfig::default(),
        }
    }
}

/// Credential-at-rest configuration.
#[derive(Debug, Clone, Default)]
pub struct SecurityConfig {
    /// AES-256-GCM key envelope-encrypting vaulted credentials, if set.
    pub vault_encryption_key: Option<[u8; 32]>,
    /// Explicit operator opt-in to run the vault without encryption.
    pub allow_plaintext_vault: bool,
}

impl SecurityConfig {
    fn from_env() -> Self {
        let vault_encryption_key = env::var("NCHAT_VAULT_KEY").ok().and_then(|hex_key| {
            let bytes = hex::decode(hex_key).ok()?;
            let array: [u8; 32] = bytes.try_into().ok()?;
            Some(array)
        });
        let allow_plaintext_vault = env::var("NCHAT_ALLOW_PLAINTEXT_VAULT")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        Self { vault_encryption_key, allow_plaintext_vault }
    }
}
