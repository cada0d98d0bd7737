//! Test double for [`Connector`]. Available under `#[cfg(test)]` or the
//! `test-util` feature, for workflow and integration-registry tests that
//! need a connector without a real external dependency.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::catalog::CatalogEntry;
use crate::connector::{Connector, ConnectorMetrics, ConnectorRequest, ConnectorResponse};
use crate::errors::ConnectorError;

/// A connector whose responses (or failures) are scripted in advance.
pub struct MockConnector {
    connector_type: String,
    responses: Mutex<Vec<Result<Value, ConnectorError>>>,
    calls: AtomicUsize,
    failures: AtomicU64,
    healthy: AtomicBool,
    connected: AtomicBool,
}

impl MockConnector {
    /// Create a mock that returns `responses` in order, one per call, and
    /// repeats the last entry once exhausted.
    pub fn new(connector_type: &str, responses: Vec<Result<Value, ConnectorError>>) -> Self {
        Self {
            connector_type: connector_type.to_string(),
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
            failures: AtomicU64::new(0),
            healthy: AtomicBool::new(true),
            connected: AtomicBool::new(false),
        }
    }

    /// Number of `call()` invocations made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Toggle what `health_check` reports.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn connector_type(&self) -> &str {
        &self.connector_type
    }

    async fn connect(&self, _config: Value, _credentials: Value) -> Result<(), ConnectorError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn catalog_entry(&self) -> CatalogEntry {
        CatalogEntry {
            connector_type: self.connector_type.clone(),
            display_name: self.connector_type.clone(),
            description: "mock connector for tests".to_string(),
            supported_actions: vec![],
            credential_schema: Value::Object(Default::default()),
        }
    }

    fn metrics(&self) -> ConnectorMetrics {
        ConnectorMetrics {
            total_calls: self.calls.load(Ordering::SeqCst) as u64,
            total_failures: self.failures.load(Ordering::SeqCst),
        }
    }

    async fn call(&self, _request: ConnectorRequest) -> Result<ConnectorResponse, ConnectorError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let responses = self.responses.lock();
        let slot = responses
            .get(index)
            .or_else(|| responses.last())
            .cloned()
            .unwrap_or(Ok(Value::Null));
        if slot.is_err() {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        slot.map(|payload| ConnectorResponse { payload })
    }

    async fn health_check(&self) -> Result<(), ConnectorError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ConnectorError::Remote {
                status: 503,
                message: "mock reports unhealthy".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replays_scripted_responses_in_order() {
        let mock = MockConnector::new(
            "test",
            vec![Ok(json!({"n": 1})), Ok(json!({"n": 2}))],
        );
        let req = ConnectorRequest {
            action: "noop".into(),
            params: Value::Null,
        };
        let r1 = mock.call(req.clone()).await.unwrap();
        let r2 = mock.call(req.clone()).await.unwrap();
        assert_eq!(r1.payload, json!({"n": 1}));
        assert_eq!(r2.payload, json!({"n": 2}));
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn repeats_last_response_once_exhausted() {
        let mock = MockConnector::new("test", vec![Ok(json!({"n": 1}))]);
        let req = ConnectorRequest {
            action: "noop".into(),
            params: Value::Null,
        };
        mock.call(req.clone()).await.unwrap();
        let r2 = mock.call(req).await.unwrap();
        assert_eq!(r2.payload, json!({"n": 1}));
    }

    #[tokio::test]
    async fn health_check_reflects_flag() {
        let mock = MockConnector::new("test", vec![]);
        assert!(mock.health_check().await.is_ok());
        mock.set_healthy(false);
        assert!(mock.health_check().await.is_err());
    }

    #[tokio::test]
    async fn connect_and_disconnect_toggle_is_connected() {
        let mock = MockConnector::new("test", vec![]);
        assert!(!mock.is_connected());
        mock.connect(json!({}), json!({"apiKey": "x"})).await.unwrap();
        assert!(mock.is_connected());
        mock.disconnect().await.unwrap();
        assert!(!mock.is_connected());
    }

    #[tokio::test]
    async fn metrics_count_calls_and_failures() {
        let mock = MockConnector::new(
            "test",
            vec![Ok(json!({"n": 1})), Err(ConnectorError::Timeout(std::time::Duration::from_secs(1)))],
        );
        let req = ConnectorRequest { action: "noop".into(), params: Value::Null };
        let _ = mock.call(req.clone()).await;
        let _ = mock.call(req).await;
        let metrics = mock.metrics();
        assert_eq!(metrics.total_calls, 2);
        assert_eq!(metrics.total_failures, 1);
    }
}
