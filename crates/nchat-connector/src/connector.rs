//! The `Connector` port: the single seam through which workflow actions
//! and the health monitor reach third-party services.

use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::CatalogEntry;
use crate::errors::ConnectorError;

/// A single outbound call to an external service.
#[derive(Debug, Clone)]
pub struct ConnectorRequest {
    /// The connector-defined action being invoked (e.g. `"send_message"`).
    pub action: String,
    /// Action-specific parameters.
    pub params: Value,
}

/// The result of a successful [`ConnectorRequest`].
#[derive(Debug, Clone)]
pub struct ConnectorResponse {
    /// Action-specific response payload.
    pub payload: Value,
}

/// Call-volume counters a connector reports about itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectorMetrics {
    /// Total `call()` invocations made since the connector connected.
    pub total_calls: u64,
    /// Of those, how many returned an error.
    pub total_failures: u64,
}

/// A handle to one external integration (Slack, a CRM, a payment
/// provider). Workflow actions and the health monitor both call through
/// this trait rather than talking to a remote API directly, so that rate
/// limiting, retries, and circuit breaking apply uniformly regardless of
/// which concrete service is behind it.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Stable identifier for the connector type, e.g. `"slack"`.
    fn connector_type(&self) -> &str;

    /// Establish the connection using installation-specific `config` and
    /// `credentials`. Must be called before `call()` is expected to
    /// succeed. Fails non-retryably on bad credentials.
    async fn connect(&self, config: Value, credentials: Value) -> Result<(), ConnectorError>;

    /// Tear down the connection established by `connect`. Best-effort:
    /// callers that only want to stop using a connector should not treat
    /// an error here as fatal.
    async fn disconnect(&self) -> Result<(), ConnectorError>;

    /// Whether `connect` has succeeded and `disconnect` has not since
    /// been called.
    fn is_connected(&self) -> bool;

    /// The catalog entry describing this connector's type, actions, and
    /// required configuration.
    fn catalog_entry(&self) -> CatalogEntry;

    /// Call-volume counters, for the integration registry's observability
    /// surface.
    fn metrics(&self) -> ConnectorMetrics;

    /// Execute `request` against the external service.
    async fn call(&self, request: ConnectorRequest) -> Result<ConnectorResponse, ConnectorError>;

    /// Perform a lightweight liveness check. Used by the health monitor;
    /// should not have side effects on the remote service.
    async fn health_check(&self) -> Result<(), ConnectorError>;
}
