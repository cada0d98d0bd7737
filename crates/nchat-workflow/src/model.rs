//! Workflow, step, and action definitions.

use std::collections::HashMap;

use nchat_trigger::{Condition, TriggerDefinition};
use nchat_types::{StepId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in a workflow's declared input contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDeclaration {
    /// Key under which this input is supplied in `start_run`'s `inputs`
    /// map and read back from `context.inputs`.
    pub name: String,
    /// If `true` and no value (nor `default_value`) is supplied,
    /// `start_run` fails with `MissingInput`.
    #[serde(default)]
    pub required: bool,
    /// Value used when the caller's `inputs` omits this key.
    #[serde(default)]
    pub default_value: Option<Value>,
}

/// How the delay before a step's next retry attempt grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryBackoff {
    /// Always `retry_delay_ms`.
    Fixed,
    /// `retry_delay_ms * attempt`.
    Linear,
    /// `retry_delay_ms * 2^(attempt - 1)`.
    Exponential,
}

/// Per-step retry, timeout, and idempotency configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSettings {
    /// Number of retries permitted after the initial attempt.
    #[serde(default)]
    pub retry_attempts: u32,
    /// Backoff shape applied between retries.
    #[serde(default = "default_backoff")]
    pub retry_backoff: RetryBackoff,
    /// Base delay in milliseconds used by the backoff formula.
    #[serde(default)]
    pub retry_delay_ms: u64,
    /// Upper bound on any single retry delay.
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    /// Wall-clock budget for a single action attempt. `None` means
    /// unbounded.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// If the action fails after exhausting retries, mark the step
    /// `skipped` instead of failing the run.
    #[serde(default)]
    pub skip_on_failure: bool,
    /// Engine-global key: once a step carrying this key has completed
    /// successfully once, any future step (in any run) with the same
    /// key is skipped rather than re-executed.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

fn default_backoff() -> RetryBackoff {
    RetryBackoff::Fixed
}

fn default_max_retry_delay_ms() -> u64 {
    u64::MAX
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            retry_attempts: 0,
            retry_backoff: RetryBackoff::Fixed,
            retry_delay_ms: 0,
            max_retry_delay_ms: u64::MAX,
            timeout_ms: None,
            skip_on_failure: false,
            idempotency_key: None,
        }
    }
}

impl StepSettings {
    /// Delay before retry attempt `attempt` (1-indexed: the delay
    /// before the first retry, i.e. attempt 2 overall, is `attempt=1`
    /// here), capped at `max_retry_delay_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let raw = match self.retry_backoff {
            RetryBackoff::Fixed => self.retry_delay_ms,
            RetryBackoff::Linear => self.retry_delay_ms.saturating_mul(attempt as u64),
            RetryBackoff::Exponential => {
                let exponent = attempt.saturating_sub(1);
                self.retry_delay_ms.saturating_mul(1u64 << exponent.min(62))
            }
        };
        raw.min(self.max_retry_delay_ms)
    }
}

/// One branch of a `conditional_branch` action: if `condition` holds,
/// the branch's `name` is recorded as the matched outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Name recorded as the match result.
    pub name: String,
    /// Condition gating this branch.
    pub condition: Condition,
}

/// The operation a step performs when it runs. Built-in kinds
/// (`SetVariable`, `Delay`, `TransformData`, `ConditionalBranch`) are
/// executed in-process by [`crate::action::ActionRegistry`]'s default
/// handlers; `Approval` is handled specially by the execution engine;
/// `SendMessage` and `HttpRequest` are routed through a
/// `nchat_connector::Connector` adapter registered by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Write a literal value into the run's variable map.
    SetVariable {
        /// Variable name to set.
        name: String,
        /// Value to store; a string value may itself contain
        /// `{{path}}` templates resolved against the run context.
        value: Value,
    },
    /// Pause step execution for a fixed duration.
    Delay {
        /// How long to pause before the step is considered complete.
        /// Validated against an upper bound of 3,600,000ms.
        duration_ms: u64,
    },
    /// Derive a new variable from existing ones via a template string.
    TransformData {
        /// Name of the variable to write the result into.
        output: String,
        /// `{{path}}` template interpolated against the run context.
        template: String,
    },
    /// Evaluate branches in order; the first whose condition holds
    /// records `{branch, matched: true}`. Matching is advisory only:
    /// the engine does not prune the DAG on your behalf — wire
    /// `depends_on` yourself if a branch should skip downstream steps.
    ConditionalBranch {
        /// Branches evaluated in order.
        branches: Vec<Branch>,
        /// Branch name used if none of `branches` match.
        #[serde(default)]
        default_branch: Option<String>,
    },
    /// Suspend the run pending human approval. Handled by
    /// [`crate::approval::ApprovalGateManager`], not the action
    /// registry.
    Approval {
        /// User ids eligible to approve or reject.
        approver_ids: Vec<String>,
        /// Message shown to approvers.
        message: String,
        /// Decision window in milliseconds. Validated against an
        /// upper bound of 86,400,000ms.
        timeout_ms: u64,
        /// Number of approvals required for the gate to open.
        min_approvals: u32,
        /// Users who may respond once the request has escalated.
        #[serde(default)]
        escalation_user_ids: Vec<String>,
    },
    /// Send a message through a connector. Requires a `send_message`
    /// handler registered by the host; unhandled otherwise.
    SendMessage {
        /// Target channel id.
        channel_id: String,
        /// Message body.
        content: String,
    },
    /// Call an arbitrary connector action. Requires an `http_request`
    /// handler registered by the host; unhandled otherwise.
    HttpRequest {
        /// Target URL.
        url: String,
        /// HTTP method.
        method: String,
    },
}

impl Action {
    /// The registry key used to look up this action's handler.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::SetVariable { .. } => "set_variable",
            Action::Delay { .. } => "delay",
            Action::TransformData { .. } => "transform_data",
            Action::ConditionalBranch { .. } => "conditional_branch",
            Action::Approval { .. } => "approval",
            Action::SendMessage { .. } => "send_message",
            Action::HttpRequest { .. } => "http_request",
        }
    }
}

/// A single node in a workflow's step graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    /// Unique id of this step within its workflow.
    pub id: StepId,
    /// Human-readable name, shown in audit logs and run history.
    pub name: String,
    /// Steps that must complete successfully before this one can run.
    #[serde(default)]
    pub depends_on: Vec<StepId>,
    /// The operation this step performs.
    pub action: Action,
    /// Conditions gating whether the step runs at all; if any fail the
    /// step is skipped with reason `"Conditions not met"` rather than
    /// executed. An empty list always runs.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Retry, timeout, and idempotency configuration.
    #[serde(default)]
    pub settings: StepSettings,
    /// Dot-paths into the run context copied into the action's input
    /// namespace before execution, keyed by the target parameter name.
    /// Built-in actions read the run context directly; this is
    /// preserved for hosts that register handlers expecting pre-mapped
    /// input rather than raw context access.
    #[serde(default)]
    pub input_mapping: Option<HashMap<String, String>>,
    /// Key under which this step's output is recorded in
    /// `context.stepOutputs`. Defaults to the step's id.
    #[serde(default)]
    pub output_key: Option<String>,
}

impl StepDefinition {
    /// How long a `Delay` action pauses for, or `None` for any other
    /// action kind.
    pub fn delay(&self) -> Option<std::time::Duration> {
        match &self.action {
            Action::Delay { duration_ms } => Some(std::time::Duration::from_millis(*duration_ms)),
            _ => None,
        }
    }
}

/// Engine-wide settings applying to every run of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSettings {
    /// Maximum number of concurrently active runs of this workflow.
    /// `None` means unbounded.
    #[serde(default)]
    pub max_concurrent_executions: Option<usize>,
    /// Wall-clock budget for an entire run. `None` means unbounded.
    #[serde(default)]
    pub max_execution_time_ms: Option<u64>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_concurrent_executions: None,
            max_execution_time_ms: None,
        }
    }
}

/// A complete, named workflow: a trigger, a set of steps, and their
/// dependency edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    /// Unique id of this workflow.
    pub id: WorkflowId,
    /// Human-readable name. Must match `^[A-Za-z][A-Za-z0-9 _-]*$` and
    /// be no more than 128 characters.
    pub name: String,
    /// Monotonically incrementing definition version; bumped whenever
    /// the workflow document is edited.
    #[serde(default = "default_version")]
    pub version: u32,
    /// What starts a run of this workflow.
    pub trigger: TriggerDefinition,
    /// Steps in original declaration order. Order is load-bearing: it
    /// is the tie-break used when computing parallel execution groups.
    /// Bounded to 50 steps.
    pub steps: Vec<StepDefinition>,
    /// Whether this workflow may currently be triggered at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Declared input contract, resolved by `start_run` into
    /// `context.inputs`.
    #[serde(default)]
    pub input_schema: Vec<InputDeclaration>,
    /// Engine-wide concurrency and timeout settings.
    #[serde(default)]
    pub settings: WorkflowSettings,
    /// Capability scopes a caller must hold to start a run. Checked by
    /// the host before calling `start_run`; the engine itself does not
    /// authenticate callers.
    #[serde(default)]
    pub required_scopes: Vec<String>,
    /// Free-form labels, bounded to 20 entries (enforced as a warning,
    /// not a hard validation failure).
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_version() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

impl WorkflowDefinition {
    /// Look up a step by id.
    pub fn step(&self, id: StepId) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }
}
