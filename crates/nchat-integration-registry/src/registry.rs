//! Installation CRUD, orchestrating the credential vault, the connector
//! instance, and the health monitor for each installed integration.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nchat_connector::{CatalogEntry, Connector};
use nchat_credential_vault::CredentialVault;
use nchat_health_monitor::HealthMonitor;
use nchat_types::InstallationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::errors::RegistryError;

/// Lifecycle state of an installed integration.
///
/// `registered` is transient: every installation moves through it on the
/// way to `connected` (or `error`, if the connector rejects the supplied
/// credentials) and is never observed sitting in it. `disabled` and
/// `error` both leave the installation intact so it can be retried with
/// [`IntegrationRegistry::enable`] or [`IntegrationRegistry::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstallationStatus {
    /// Metadata and credential recorded, connector not yet dialed.
    Registered,
    /// Connector is connected and available for workflows to use.
    Connected,
    /// Manually disabled by a user; the health monitor does not touch it.
    Disabled,
    /// The connector failed to connect (bad credentials, unreachable
    /// service) and needs operator attention.
    Error,
}

/// A configured instance of a connector type, owned by one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    /// Unique identifier for this installation.
    pub id: InstallationId,
    /// The connector type this installation is an instance of.
    pub connector_type: String,
    /// User-facing label, e.g. "Engineering Slack".
    pub display_name: String,
    /// Non-secret connector configuration, passed to `connect` alongside
    /// the credential held in the vault.
    pub config: Value,
    /// Current lifecycle status.
    pub status: InstallationStatus,
    /// When the installation was created.
    pub created_at: DateTime<Utc>,
    /// When the installation was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Catalog of available connector types plus CRUD over installations.
pub struct IntegrationRegistry {
    catalog: HashMap<String, CatalogEntry>,
    installations: Mutex<HashMap<InstallationId, Installation>>,
    connectors: Mutex<HashMap<InstallationId, Arc<dyn Connector>>>,
    vault: Arc<CredentialVault>,
    health_monitor: Arc<HealthMonitor>,
}

impl IntegrationRegistry {
    /// Build a registry over a fixed set of catalog entries.
    pub fn new(
        catalog: Vec<CatalogEntry>,
        vault: Arc<CredentialVault>,
        health_monitor: Arc<HealthMonitor>,
    ) -> Self {
        Self {
            catalog: catalog
                .into_iter()
                .map(|entry| (entry.connector_type.clone(), entry))
                .collect(),
            installations: Mutex::new(HashMap::new()),
            connectors: Mutex::new(HashMap::new()),
            vault,
            health_monitor,
        }
    }

    /// All connector types available for installation.
    pub fn list_catalog(&self) -> Vec<&CatalogEntry> {
        self.catalog.values().collect()
    }

    /// Install a new instance of `connector_type`: dial `connector` with
    /// `config` and `credential`, and only if that succeeds store the
    /// credential in the vault and register for health monitoring.
    pub async fn install(
        &self,
        connector_type: &str,
        display_name: &str,
        config: Value,
        credential: &Value,
        connector: Arc<dyn Connector>,
        now: DateTime<Utc>,
    ) -> Result<Installation, RegistryError> {
        if !self.catalog.contains_key(connector_type) {
            return Err(RegistryError::UnknownConnectorType(
                connector_type.to_string(),
            ));
        }

        connector
            .connect(config.clone(), credential.clone())
            .await
            .map_err(|err| RegistryError::AuthError(err.to_string()))?;

        let installation = Installation {
            id: InstallationId::new(),
            connector_type: connector_type.to_string(),
            display_name: display_name.to_string(),
            config,
            status: InstallationStatus::Connected,
            created_at: now,
            updated_at: now,
        };

        self.vault
            .store_credential(installation.id, credential)
            .await?;
        self.health_monitor
            .register(installation.id, connector.clone())
            .await;
        self.connectors
            .lock()
            .await
            .insert(installation.id, connector);

        self.installations
            .lock()
            .await
            .insert(installation.id, installation.clone());

        info!(
            installation_id = %installation.id,
            connector_type,
            "installed integration"
        );
        Ok(installation)
    }

    /// Fetch metadata for an installation.
    pub async fn get(&self, id: InstallationId) -> Result<Installation, RegistryError> {
        self.installations
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(RegistryError::UnknownInstallation(id))
    }

    /// List every installation.
    pub async fn list(&self) -> Vec<Installation> {
        self.installations.lock().await.values().cloned().collect()
    }

    /// Replace the stored credential for an existing installation.
    pub async fn update_credential(
        &self,
        id: InstallationId,
        credential: &Value,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let mut installations = self.installations.lock().await;
        let installation = installations
            .get_mut(&id)
            .ok_or(RegistryError::UnknownInstallation(id))?;
        self.vault.store_credential(id, credential).await?;
        installation.updated_at = now;
        Ok(())
    }

    /// Merge `partial_config` into the installation's stored config and
    /// re-dial the connector with the merged result plus its existing
    /// credential.
    pub async fn configure(
        &self,
        id: InstallationId,
        partial_config: Value,
        now: DateTime<Utc>,
    ) -> Result<Installation, RegistryError> {
        let connector = self
            .connectors
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(RegistryError::UnknownInstallation(id))?;
        let credential = self.vault.get_credential(id).await?;

        let mut installations = self.installations.lock().await;
        let installation = installations
            .get_mut(&id)
            .ok_or(RegistryError::UnknownInstallation(id))?;

        merge_json(&mut installation.config, partial_config);

        if let Err(err) = connector
            .connect(installation.config.clone(), credential)
            .await
        {
            installation.status = InstallationStatus::Error;
            installation.updated_at = now;
            return Err(RegistryError::ConfigError(err.to_string()));
        }

        installation.status = InstallationStatus::Connected;
        installation.updated_at = now;
        Ok(installation.clone())
    }

    /// Re-dial a disabled or errored installation's connector and mark it
    /// connected again.
    pub async fn enable(&self, id: InstallationId, now: DateTime<Utc>) -> Result<(), RegistryError> {
        let connector = self
            .connectors
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(RegistryError::UnknownInstallation(id))?;
        let credential = self.vault.get_credential(id).await?;

        let mut installations = self.installations.lock().await;
        let installation = installations
            .get_mut(&id)
            .ok_or(RegistryError::UnknownInstallation(id))?;

        if installation.status == InstallationStatus::Connected {
            return Err(RegistryError::InvalidState(id));
        }

        if let Err(err) = connector.connect(installation.config.clone(), credential).await {
            installation.status = InstallationStatus::Error;
            installation.updated_at = now;
            return Err(RegistryError::AuthError(err.to_string()));
        }

        installation.status = InstallationStatus::Connected;
        installation.updated_at = now;
        Ok(())
    }

    /// Disconnect an installation's connector (best-effort) and mark it
    /// disabled without removing it.
    pub async fn disable(&self, id: InstallationId, now: DateTime<Utc>) -> Result<(), RegistryError> {
        if let Some(connector) = self.connectors.lock().await.get(&id).cloned() {
            if let Err(err) = connector.disconnect().await {
                warn!(installation_id = %id, error = %err, "best-effort disconnect failed during disable");
            }
        }

        let mut installations = self.installations.lock().await;
        let installation = installations
            .get_mut(&id)
            .ok_or(RegistryError::UnknownInstallation(id))?;
        installation.status = InstallationStatus::Disabled;
        installation.updated_at = now;
        Ok(())
    }

    /// Permanently remove an installation, its credential, and its health
    /// monitor registration. Disconnects the connector best-effort.
    pub async fn uninstall(&self, id: InstallationId) -> Result<(), RegistryError> {
        let mut installations = self.installations.lock().await;
        installations
            .remove(&id)
            .ok_or(RegistryError::UnknownInstallation(id))?;
        drop(installations);

        if let Some(connector) = self.connectors.lock().await.remove(&id) {
            if let Err(err) = connector.disconnect().await {
                warn!(installation_id = %id, error = %err, "best-effort disconnect failed during uninstall");
            }
        }

        self.vault.delete_credential(id).await?;
        self.health_monitor.deregister(id).await;
        Ok(())
    }

    /// Best-effort disconnect every connected installation, e.g. on
    /// process shutdown. Installations and credentials are left intact.
    pub async fn shutdown(&self, now: DateTime<Utc>) {
        let connected_ids: Vec<InstallationId> = {
            let installations = self.installations.lock().await;
            installations
                .values()
                .filter(|installation| installation.status == InstallationStatus::Connected)
                .map(|installation| installation.id)
                .collect()
        };

        for id in connected_ids {
            if let Some(connector) = self.connectors.lock().await.get(&id).cloned() {
                if let Err(err) = connector.disconnect().await {
                    warn!(installation_id = %id, error = %err, "best-effort disconnect failed during shutdown");
                }
            }
            self.health_monitor.deregister(id).await;
            if let Some(installation) = self.installations.lock().await.get_mut(&id) {
                installation.status = InstallationStatus::Disabled;
                installation.updated_at = now;
            }
        }

        info!("integration registry shut down");
    }
}

/// Shallow merge: keys present in `patch` overwrite the corresponding key
/// in `base`; non-object patches replace `base` wholesale.
fn merge_json(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                base_map.insert(key, value);
            }
        }
        (base, patch) => *base = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nchat_connector::mock::MockConnector;
    use nchat_health_monitor::HealthMonitorConfig;
    use nchat_secure_storage::InMemorySecureStorage;
    use nchat_types::FixedClock;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn slack_catalog_entry() -> CatalogEntry {
        CatalogEntry {
            connector_type: "slack".to_string(),
            display_name: "Slack".to_string(),
            description: "Send and receive Slack messages".to_string(),
            supported_actions: vec!["send_message".to_string()],
            credential_schema: json!({"apiKey": "string"}),
        }
    }

    fn test_registry() -> IntegrationRegistry {
        let storage = Arc::new(InMemorySecureStorage::new());
        let vault = Arc::new(nchat_credential_vault::CredentialVault::passthrough(storage));
        let clock = Arc::new(FixedClock::new(now()));
        let monitor = Arc::new(HealthMonitor::new(
            HealthMonitorConfig::default(),
            clock,
            Arc::new(nchat_telemetry::Metrics::new()),
        ));
        IntegrationRegistry::new(vec![slack_catalog_entry()], vault, monitor)
    }

    #[tokio::test]
    async fn install_then_get_roundtrips() {
        let registry = test_registry();
        let connector = Arc::new(MockConnector::new("slack", vec![]));
        let installation = registry
            .install(
                "slack",
                "Eng Slack",
                json!({}),
                &json!({"apiKey": "x"}),
                connector,
                now(),
            )
            .await
            .unwrap();

        let fetched = registry.get(installation.id).await.unwrap();
        assert_eq!(fetched.display_name, "Eng Slack");
        assert_eq!(fetched.status, InstallationStatus::Connected);
    }

    #[tokio::test]
    async fn install_rejects_unknown_connector_type() {
        let registry = test_registry();
        let connector = Arc::new(MockConnector::new("unknown", vec![]));
        let result = registry
            .install("unknown", "x", json!({}), &json!({}), connector, now())
            .await;
        assert!(matches!(result, Err(RegistryError::UnknownConnectorType(_))));
    }

    #[tokio::test]
    async fn uninstall_removes_metadata() {
        let registry = test_registry();
        let connector = Arc::new(MockConnector::new("slack", vec![]));
        let installation = registry
            .install("slack", "Eng Slack", json!({}), &json!({}), connector, now())
            .await
            .unwrap();

        registry.uninstall(installation.id).await.unwrap();
        assert!(matches!(
            registry.get(installation.id).await,
            Err(RegistryError::UnknownInstallation(_))
        ));
    }

    #[tokio::test]
    async fn disable_then_enable_round_trips_status() {
        let registry = test_registry();
        let connector = Arc::new(MockConnector::new("slack", vec![]));
        let installation = registry
            .install("slack", "Eng Slack", json!({}), &json!({}), connector, now())
            .await
            .unwrap();

        registry.disable(installation.id, now()).await.unwrap();
        let fetched = registry.get(installation.id).await.unwrap();
        assert_eq!(fetched.status, InstallationStatus::Disabled);

        registry.enable(installation.id, now()).await.unwrap();
        let fetched = registry.get(installation.id).await.unwrap();
        assert_eq!(fetched.status, InstallationStatus::Connected);
    }

    #[tokio::test]
    async fn enable_rejects_already_connected_installation() {
        let registry = test_registry();
        let connector = Arc::new(MockConnector::new("slack", vec![]));
        let installation = registry
            .install("slack", "Eng Slack", json!({}), &json!({}), connector, now())
            .await
            .unwrap();

        assert!(matches!(
            registry.enable(installation.id, now()).await,
            Err(RegistryError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn configure_merges_partial_config() {
        let registry = test_registry();
        let connector = Arc::new(MockConnector::new("slack", vec![]));
        let installation = registry
            .install(
                "slack",
                "Eng Slack",
                json!({"channel": "#general"}),
                &json!({}),
                connector,
                now(),
            )
            .await
            .unwrap();

        let updated = registry
            .configure(installation.id, json!({"timeoutMs": 5000}), now())
            .await
            .unwrap();
        assert_eq!(updated.config, json!({"channel": "#general", "timeoutMs": 5000}));
        assert_eq!(updated.status, InstallationStatus::Connected);
    }

    #[tokio::test]
    async fn shutdown_disconnects_and_disables_connected_installations() {
        let registry = test_registry();
        let connector = Arc::new(MockConnector::new("slack", vec![]));
        let installation = registry
            .install("slack", "Eng Slack", json!({}), &json!({}), connector.clone(), now())
            .await
            .unwrap();

        registry.shutdown(now()).await;

        let fetched = registry.get(installation.id).await.unwrap();
        assert_eq!(fetched.status, InstallationStatus::Disabled);
        assert!(!connector.is_connected());
    }
}
