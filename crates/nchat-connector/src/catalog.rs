//! Catalog entry describing a connector type available for installation.

use serde::{Deserialize, Serialize};

/// Describes one installable connector type, independent of any particular
/// installation's credentials or configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Stable connector type identifier, e.g. `"slack"`.
    pub connector_type: String,
    /// Human-readable display name.
    pub display_name: String,
    /// One-line description shown in an integration picker UI.
    pub description: String,
    /// Action names this connector supports.
    pub supported_actions: Vec<String>,
    /// JSON-schema-shaped description of the credential fields this
    /// connector requires (e.g. `{"apiKey": "string"}`).
    pub credential_schema: serde_json::Value,
}
