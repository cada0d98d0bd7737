//! Run-time state for one execution of a [`WorkflowDefinition`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use nchat_types::{RunId, StepId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Queued but not yet started.
    Pending,
    /// Actively executing steps, or suspended on a delay/approval gate.
    Running,
    /// All steps completed (or were skipped).
    Completed,
    /// A step failed permanently (and did not have `skip_on_failure` set).
    Failed,
    /// Cancelled by the caller.
    Cancelled,
    /// Exceeded `settings.max_execution_time_ms`.
    TimedOut,
}

impl RunStatus {
    /// Whether this status is terminal — no further execution happens.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled | RunStatus::TimedOut)
    }
}

/// Status of a single step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet started.
    Pending,
    /// Currently executing (including retry attempts).
    Running,
    /// Completed successfully.
    Completed,
    /// Its `conditions` did not hold, or it reused an idempotency key.
    Skipped,
    /// Failed permanently.
    Failed,
}

/// Outcome of one step's execution within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// The step this result belongs to.
    pub step_id: StepId,
    /// Current status.
    pub status: StepStatus,
    /// When the step's first attempt began.
    pub started_at: DateTime<Utc>,
    /// When the step reached a terminal status, if it has.
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock time spent across all attempts, in milliseconds.
    pub duration_ms: u64,
    /// The action's output value, if it completed successfully.
    pub output: Option<Value>,
    /// Error message, if it failed.
    pub error: Option<String>,
    /// Number of retries consumed (0 if it succeeded or failed on the
    /// first attempt).
    pub retry_count: u32,
    /// Why the step was skipped, if it was.
    pub skip_reason: Option<String>,
}

impl StepResult {
    fn pending(step_id: StepId, now: DateTime<Utc>) -> Self {
        Self {
            step_id,
            status: StepStatus::Pending,
            started_at: now,
            completed_at: None,
            duration_ms: 0,
            output: None,
            error: None,
            retry_count: 0,
            skip_reason: None,
        }
    }
}

/// The run's working data: initial inputs, the payload that triggered
/// it, variables written by steps, and each step's recorded output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunContext {
    /// Resolved input values for this run.
    pub inputs: Map<String, Value>,
    /// The payload carried by whatever triggered this run.
    pub trigger_data: Value,
    /// Variables written by `set_variable`/`transform_data`/
    /// `conditional_branch` steps as the run progresses.
    pub variables: Map<String, Value>,
    /// Outputs of completed steps, keyed by step id as a string (so the
    /// context serializes as plain JSON).
    pub step_outputs: HashMap<String, Value>,
}

impl RunContext {
    /// A flattened JSON view of the whole context, suitable for
    /// `nchat_trigger::Context` dot-path resolution (e.g.
    /// `"inputs.shouldRun"`, `"variables.x"`).
    pub fn as_value(&self) -> Value {
        serde_json::json!({
            "inputs": self.inputs,
            "triggerData": self.trigger_data,
            "variables": self.variables,
            "stepOutputs": self.step_outputs,
        })
    }
}

/// A complete, named workflow: a set of steps and their dependency edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Unique id of this run.
    pub id: RunId,
    /// The workflow this run executes.
    pub workflow_id: WorkflowId,
    /// Overall run status.
    pub status: RunStatus,
    /// The run's working data.
    pub context: RunContext,
    /// Per-step results, keyed by step id.
    pub step_results: HashMap<StepId, StepResult>,
    /// Error message if the run failed or timed out.
    pub error: Option<String>,
    /// How many times this run has been retried via `retry_run`; 0 for
    /// an original run.
    pub retry_count: u32,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Run {
    /// Start a new run of `workflow_id`.
    pub fn new(
        workflow_id: WorkflowId,
        inputs: Map<String, Value>,
        trigger_data: Value,
        retry_count: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RunId::new(),
            workflow_id,
            status: RunStatus::Pending,
            context: RunContext {
                inputs,
                trigger_data,
                variables: Map::new(),
                step_outputs: HashMap::new(),
            },
            step_results: HashMap::new(),
            error: None,
            retry_count,
            started_at,
            completed_at: None,
        }
    }

    /// Ensure a pending [`StepResult`] exists for `step_id`, returning
    /// a mutable reference to it.
    pub fn result_mut(&mut self, step_id: StepId, now: DateTime<Utc>) -> &mut StepResult {
        self.step_results.entry(step_id).or_insert_with(|| StepResult::pending(step_id, now))
    }
}
