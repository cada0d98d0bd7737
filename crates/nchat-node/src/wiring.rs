//! Bridges `nchat_connector::Connector` instances into the workflow
//! engine's `ActionRegistry`, so `send_message`/`http_request` steps
//! reach real integrations instead of failing with `Unhandled`.

use std::sync::Arc;

use async_trait::async_trait;
use nchat_connector::{Connector, ConnectorRequest};
use nchat_workflow::{Action, ActionContext, ActionError, ActionHandler};
use serde_json::Value;

/// Routes a `send_message` or `http_request` action to a single
/// connector instance. A host registers one of these per installation
/// it wants reachable from workflows, keyed by the installation's
/// connector action name in the registry.
pub struct ConnectorActionHandler {
    connector: Arc<dyn Connector>,
}

impl ConnectorActionHandler {
    /// Dispatch actions through `connector`.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl ActionHandler for ConnectorActionHandler {
    async fn execute(&self, action: &Action, _ctx: &mut ActionContext<'_>) -> Result<Value, ActionError> {
        let request = match action {
            Action::SendMessage { channel_id, content } => ConnectorRequest {
                action: "send_message".into(),
                params: serde_json::json!({ "channelId": channel_id, "content": content }),
            },
            Action::HttpRequest { url, method } => ConnectorRequest {
                action: "http_request".into(),
                params: serde_json::json!({ "url": url, "method": method }),
            },
            other => return Err(ActionError::InvalidInput(format!("connector handler cannot run '{}'", other.kind()))),
        };

        self.connector
            .call(request)
            .await
            .map(|response| response.payload)
            .map_err(|e| ActionError::Retryable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nchat_connector::mock::MockConnector;
    use serde_json::{json, Map};

    #[tokio::test]
    async fn routes_send_message_through_the_connector() {
        let mock = Arc::new(MockConnector::new("slack", vec![Ok(json!({"ok": true}))]));
        let handler = ConnectorActionHandler::new(mock);
        let mut variables = Map::new();
        let mut ctx = ActionContext::new(&mut variables);
        let action = Action::SendMessage { channel_id: "C1".into(), content: "hi".into() };
        let out = handler.execute(&action, &mut ctx).await.unwrap();
        assert_eq!(out, json!({"ok": true}));
    }
}
