//! Action handlers: the pluggable execution behind each [`Action`] kind.
//!
//! Built-in handlers (`set_variable`, `delay`, `transform_data`,
//! `conditional_branch`) run entirely in-process. `send_message` and
//! `http_request` are left unregistered by default — a host wires them
//! up to a `nchat_connector::Connector` adapter — so calling them
//! without registration fails with [`ActionError::Unhandled`] rather
//! than silently no-opping.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::ActionError;
use crate::model::Action;

/// Mutable view over a run's variable store, passed to a handler so it
/// can read prior steps' outputs and write its own.
pub struct ActionContext<'a> {
    variables: &'a mut Map<String, Value>,
}

impl<'a> ActionContext<'a> {
    /// Wrap a run's variable map for a single action invocation.
    pub fn new(variables: &'a mut Map<String, Value>) -> Self {
        Self { variables }
    }

    /// A read-only `nchat_trigger::Context` snapshot of the current
    /// variables, for condition evaluation and template interpolation.
    pub fn as_trigger_context(&self) -> nchat_trigger::Context {
        nchat_trigger::Context::new(Value::Object(self.variables.clone()))
    }

    /// Write a variable.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }
}

/// Behavior executed for one kind of [`Action`]. Returns the value to
/// record as the step's output, or an [`ActionError`] describing why it
/// could not run.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Run the action, mutating `ctx`'s variables as needed.
    async fn execute(&self, action: &Action, ctx: &mut ActionContext<'_>) -> Result<Value, ActionError>;
}

struct SetVariableHandler;

#[async_trait]
impl ActionHandler for SetVariableHandler {
    async fn execute(&self, action: &Action, ctx: &mut ActionContext<'_>) -> Result<Value, ActionError> {
        let Action::SetVariable { name, value } = action else {
            return Err(ActionError::InvalidInput("expected set_variable".into()));
        };
        let resolved = resolve_value(value, ctx);
        ctx.set(name.clone(), resolved.clone());
        Ok(resolved)
    }
}

struct DelayHandler;

#[async_trait]
impl ActionHandler for DelayHandler {
    async fn execute(&self, action: &Action, _ctx: &mut ActionContext<'_>) -> Result<Value, ActionError> {
        let Action::Delay { duration_ms } = action else {
            return Err(ActionError::InvalidInput("expected delay".into()));
        };
        tokio::time::sleep(std::time::Duration::from_millis(*duration_ms)).await;
        Ok(Value::Null)
    }
}

struct TransformDataHandler;

#[async_trait]
impl ActionHandler for TransformDataHandler {
    async fn execute(&self, action: &Action, ctx: &mut ActionContext<'_>) -> Result<Value, ActionError> {
        let Action::TransformData { output, template } = action else {
            return Err(ActionError::InvalidInput("expected transform_data".into()));
        };
        let rendered = nchat_trigger::interpolate(template, &ctx.as_trigger_context());
        let value = Value::String(rendered);
        ctx.set(output.clone(), value.clone());
        Ok(value)
    }
}

struct ConditionalBranchHandler;

#[async_trait]
impl ActionHandler for ConditionalBranchHandler {
    async fn execute(&self, action: &Action, ctx: &mut ActionContext<'_>) -> Result<Value, ActionError> {
        let Action::ConditionalBranch { branches, default_branch } = action else {
            return Err(ActionError::InvalidInput("expected conditional_branch".into()));
        };
        let trigger_ctx = ctx.as_trigger_context();
        let matched = branches.iter().find(|branch| branch.condition.evaluate(&trigger_ctx));
        match matched {
            Some(branch) => Ok(serde_json::json!({ "branch": branch.name, "matched": true })),
            None => Ok(serde_json::json!({ "branch": default_branch, "matched": false })),
        }
    }
}

fn resolve_value(value: &Value, ctx: &ActionContext<'_>) -> Value {
    match value {
        Value::String(s) if s.contains("{{") => {
            Value::String(nchat_trigger::interpolate(s, &ctx.as_trigger_context()))
        }
        other => other.clone(),
    }
}

/// Registry mapping action kinds to the handler that executes them.
/// Built with the four in-process handlers pre-registered; a host
/// registers `send_message`/`http_request` (or overrides a built-in) via
/// [`ActionRegistry::register`].
pub struct ActionRegistry {
    handlers: HashMap<&'static str, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// A registry with only the built-in, connector-free handlers
    /// registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Arc<dyn ActionHandler>> = HashMap::new();
        handlers.insert("set_variable", Arc::new(SetVariableHandler));
        handlers.insert("delay", Arc::new(DelayHandler));
        handlers.insert("transform_data", Arc::new(TransformDataHandler));
        handlers.insert("conditional_branch", Arc::new(ConditionalBranchHandler));
        Self { handlers }
    }

    /// Register (or replace) the handler for `kind`.
    pub fn register(&mut self, kind: &'static str, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Run `action`, dispatching to its registered handler.
    pub async fn execute(&self, action: &Action, ctx: &mut ActionContext<'_>) -> Result<Value, ActionError> {
        let kind = action.kind();
        match self.handlers.get(kind) {
            Some(handler) => handler.execute(action, ctx).await,
            None => Err(ActionError::Unhandled(kind.to_string())),
        }
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn set_variable_writes_literal() {
        let registry = ActionRegistry::new();
        let mut variables = vars(json!({}));
        let mut ctx = ActionContext::new(&mut variables);
        let action = Action::SetVariable {
            name: "greeting".into(),
            value: json!("hi"),
        };
        let out = registry.execute(&action, &mut ctx).await.unwrap();
        assert_eq!(out, json!("hi"));
        assert_eq!(variables.get("greeting").unwrap(), "hi");
    }

    #[tokio::test]
    async fn set_variable_interpolates_templates() {
        let registry = ActionRegistry::new();
        let mut variables = vars(json!({"name": "Ada"}));
        let mut ctx = ActionContext::new(&mut variables);
        let action = Action::SetVariable {
            name: "greeting".into(),
            value: json!("Hello, {{name}}!"),
        };
        let out = registry.execute(&action, &mut ctx).await.unwrap();
        assert_eq!(out, json!("Hello, Ada!"));
    }

    #[tokio::test]
    async fn transform_data_renders_template_into_output() {
        let registry = ActionRegistry::new();
        let mut variables = vars(json!({"a": 1, "b": 2}));
        let mut ctx = ActionContext::new(&mut variables);
        let action = Action::TransformData {
            output: "sum_label".into(),
            template: "{{a}}+{{b}}".into(),
        };
        registry.execute(&action, &mut ctx).await.unwrap();
        assert_eq!(variables.get("sum_label").unwrap(), "1+2");
    }

    #[tokio::test]
    async fn conditional_branch_picks_first_matching_branch() {
        use nchat_trigger::{Condition, ConditionOperator};
        let registry = ActionRegistry::new();
        let mut variables = vars(json!({"status": "open"}));
        let mut ctx = ActionContext::new(&mut variables);
        let action = Action::ConditionalBranch {
            branches: vec![crate::model::Branch {
                name: "is_open".into(),
                condition: Condition {
                    field: "status".into(),
                    operator: ConditionOperator::Equals,
                    value: Some(json!("open")),
                },
            }],
            default_branch: Some("fallback".into()),
        };
        let out = registry.execute(&action, &mut ctx).await.unwrap();
        assert_eq!(out, json!({"branch": "is_open", "matched": true}));
    }

    #[tokio::test]
    async fn conditional_branch_falls_back_when_nothing_matches() {
        use nchat_trigger::{Condition, ConditionOperator};
        let registry = ActionRegistry::new();
        let mut variables = vars(json!({"status": "closed"}));
        let mut ctx = ActionContext::new(&mut variables);
        let action = Action::ConditionalBranch {
            branches: vec![crate::model::Branch {
                name: "is_open".into(),
                condition: Condition {
                    field: "status".into(),
                    operator: ConditionOperator::Equals,
                    value: Some(json!("open")),
                },
            }],
            default_branch: Some("fallback".into()),
        };
        let out = registry.execute(&action, &mut ctx).await.unwrap();
        assert_eq!(out, json!({"branch": "fallback", "matched": false}));
    }

    #[tokio::test]
    async fn unregistered_action_is_unhandled() {
        let registry = ActionRegistry::new();
        let mut variables = vars(json!({}));
        let mut ctx = ActionContext::new(&mut variables);
        let action = Action::SendMessage {
            channel_id: "abc".into(),
            content: "hi".into(),
        };
        let err = registry.execute(&action, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::Unhandled(_)));
    }

    #[tokio::test]
    async fn custom_handler_can_be_registered() {
        struct Echo;
        #[async_trait]
        impl ActionHandler for Echo {
            async fn execute(&self, _action: &Action, _ctx: &mut ActionContext<'_>) -> Result<Value, ActionError> {
                Ok(json!("echoed"))
            }
        }
        let mut registry = ActionRegistry::new();
        registry.register("send_message", Arc::new(Echo));
        let mut variables = vars(json!({}));
        let mut ctx = ActionContext::new(&mut variables);
        let action = Action::SendMessage {
            channel_id: "abc".into(),
            content: "hi".into(),
        };
        let out = registry.execute(&action, &mut ctx).await.unwrap();
        assert_eq!(out, json!("echoed"));
    }
}
