//! The run execution engine: drives a workflow's steps through their
//! computed [`ExecutionSchedule`] one at a time, honoring conditions,
//! idempotency, retries, and approval gates.
//!
//! Steps within a single run execute sequentially in topological
//! order — only separate runs (of the same or different workflows)
//! execute concurrently. `ExecutionSchedule`'s parallel groups exist to
//! prove the DAG ordering is valid and deterministic, not to fan steps
//! out concurrently within one run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nchat_telemetry::MetricsRecorder;
use nchat_types::{Clock, RunId, StepId, WorkflowId};
use parking_lot::Mutex as SyncMutex;
use serde_json::{Map, Value};
use tokio::sync::Mutex as AsyncMutex;

use crate::action::{ActionContext, ActionRegistry};
use crate::approval::{ApprovalGateManager, ApprovalStatus};
use crate::audit::{AuditEntry, AuditLog};
use crate::errors::EngineError;
use crate::graph::{topological_schedule, ExecutionSchedule};
use crate::model::{Action, StepDefinition, WorkflowDefinition};
use crate::run::{Run, RunStatus, StepStatus};
use crate::validation::validate;

struct RunExecution {
    schedule: ExecutionSchedule,
    flattened: Vec<StepId>,
    next_step: usize,
    workflow: WorkflowDefinition,
}

/// Outcome of attempting to run a single step once (after any retries).
enum StepOutcome {
    Completed(Value),
    Skipped(String),
    Waiting,
    Failed(String),
}

/// Orchestrates workflow runs: validation, scheduling, retrying, gating
/// on approvals, and recording an audit trail as it goes.
pub struct ExecutionEngine {
    registry: ActionRegistry,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MetricsRecorder>,
    approvals: ApprovalGateManager,
    audit: AuditLog,
    runs: AsyncMutex<HashMap<RunId, Arc<AsyncMutex<Run>>>>,
    executions: SyncMutex<HashMap<RunId, RunExecution>>,
    active_by_workflow: SyncMutex<HashMap<WorkflowId, HashSet<RunId>>>,
    completed_idempotency_keys: SyncMutex<HashSet<String>>,
}

impl ExecutionEngine {
    /// Build an engine. `registry` supplies the action handlers
    /// (built-ins plus any connector-backed ones the host registered);
    /// `clock` and `metrics` are injected for determinism and
    /// observability.
    pub fn new(registry: ActionRegistry, clock: Arc<dyn Clock>, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            registry,
            approvals: ApprovalGateManager::new(clock.clone()),
            clock,
            metrics,
            audit: AuditLog::new(),
            runs: AsyncMutex::new(HashMap::new()),
            executions: SyncMutex::new(HashMap::new()),
            active_by_workflow: SyncMutex::new(HashMap::new()),
            completed_idempotency_keys: SyncMutex::new(HashSet::new()),
        }
    }

    /// The engine's audit trail.
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// The engine's approval gate manager, for callers that need to
    /// respond to or escalate gates directly.
    pub fn approvals(&self) -> &ApprovalGateManager {
        &self.approvals
    }

    /// Snapshot of a run's current state.
    pub async fn get_run(&self, run_id: RunId) -> Option<Run> {
        let handle = self.runs.lock().await.get(&run_id).cloned()?;
        Some(handle.lock().await.clone())
    }

    /// All runs matching `workflow_id` (if set) and `status` (if set),
    /// with `started_at` in `[since, until]` (either bound optional).
    pub async fn list_runs(
        &self,
        workflow_id: Option<WorkflowId>,
        status: Option<RunStatus>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Vec<Run> {
        let handles: Vec<_> = self.runs.lock().await.values().cloned().collect();
        let mut out = Vec::new();
        for handle in handles {
            let run = handle.lock().await;
            if workflow_id.is_some_and(|id| id != run.workflow_id) {
                continue;
            }
            if status.is_some_and(|s| s != run.status) {
                continue;
            }
            if since.is_some_and(|t| run.started_at < t) {
                continue;
            }
            if until.is_some_and(|t| run.started_at > t) {
                continue;
            }
            out.push(run.clone());
        }
        out
    }

    /// Validate `workflow`, start a new run of it with `inputs` and
    /// `trigger_data`, and drive it forward until it completes, fails,
    /// times out, or suspends on an approval gate.
    pub async fn start_run(
        &self,
        workflow: WorkflowDefinition,
        inputs: Map<String, Value>,
        trigger_data: Value,
    ) -> Result<RunId, EngineError> {
        self.start_run_with_retry_count(workflow, inputs, trigger_data, 0).await
    }

    /// Re-run a `failed` run's workflow with the same inputs, recording
    /// `retry_count = prior.retry_count + 1`.
    pub async fn retry_run(&self, run_id: RunId, workflow: WorkflowDefinition) -> Result<RunId, EngineError> {
        let prior = self.get_run(run_id).await.ok_or(EngineError::UnknownRun(run_id))?;
        if prior.status != RunStatus::Failed {
            return Err(EngineError::NotRetryable(run_id));
        }
        self.start_run_with_retry_count(workflow, prior.context.inputs, prior.context.trigger_data, prior.retry_count + 1)
            .await
    }

    async fn start_run_with_retry_count(
        &self,
        workflow: WorkflowDefinition,
        supplied_inputs: Map<String, Value>,
        trigger_data: Value,
        retry_count: u32,
    ) -> Result<RunId, EngineError> {
        let errors = validate(&workflow);
        if !errors.is_empty() {
            return Err(EngineError::InvalidDefinition(errors));
        }

        if let Some(limit) = workflow.settings.max_concurrent_executions {
            let active = self.active_by_workflow.lock();
            let count = active.get(&workflow.id).map(|set| set.len()).unwrap_or(0);
            if count >= limit {
                return Err(EngineError::ConcurrencyLimitExceeded(count));
            }
        }

        let resolved_inputs = resolve_inputs(&workflow, supplied_inputs)?;

        let schedule = topological_schedule(&workflow)?;
        let flattened: Vec<StepId> = schedule.groups.iter().flat_map(|g| g.steps.iter().copied()).collect();

        let now = self.clock.now();
        let run = Run::new(workflow.id, resolved_inputs, trigger_data, retry_count, now);
        let run_id = run.id;

        self.runs.lock().await.insert(run_id, Arc::new(AsyncMutex::new(run)));
        self.executions.lock().insert(
            run_id,
            RunExecution {
                schedule,
                flattened,
                next_step: 0,
                workflow: workflow.clone(),
            },
        );
        self.active_by_workflow.lock().entry(workflow.id).or_default().insert(run_id);

        self.audit.record(AuditEntry {
            timestamp: now,
            run_id,
            step_id: None,
            kind: "workflow.run_started".into(),
            detail: String::new(),
        });
        self.metrics.record_run_started();

        self.drive(run_id).await?;
        Ok(run_id)
    }

    /// Re-evaluate a run that is suspended on an approval gate, resuming
    /// execution if the gate has since been decided. A no-op if the run
    /// is already terminal or its gate is still pending.
    pub async fn resume_run(&self, run_id: RunId) -> Result<(), EngineError> {
        self.drive(run_id).await
    }

    /// Best-effort cancellation: a run in the middle of a step finishes
    /// that step, then is observed cancelled at the next step boundary.
    /// An approval wait is cancelled immediately.
    pub async fn cancel_run(&self, run_id: RunId) -> Result<(), EngineError> {
        let run_handle = self.runs.lock().await.get(&run_id).cloned().ok_or(EngineError::UnknownRun(run_id))?;
        let mut run = run_handle.lock().await;
        if run.status.is_terminal() {
            return Ok(());
        }
        run.status = RunStatus::Cancelled;
        run.completed_at = Some(self.clock.now());
        drop(run);
        self.deactivate(run_id).await;
        self.audit.record(AuditEntry {
            timestamp: self.clock.now(),
            run_id,
            step_id: None,
            kind: "workflow.run_cancelled".into(),
            detail: String::new(),
        });
        Ok(())
    }

    async fn deactivate(&self, run_id: RunId) {
        let workflow_id = self.executions.lock().get(&run_id).map(|e| e.workflow.id);
        if let Some(workflow_id) = workflow_id {
            let mut active = self.active_by_workflow.lock();
            if let Some(set) = active.get_mut(&workflow_id) {
                set.remove(&run_id);
            }
        }
    }

    async fn drive(&self, run_id: RunId) -> Result<(), EngineError> {
        loop {
            let run_handle = self.runs.lock().await.get(&run_id).cloned().ok_or(EngineError::UnknownRun(run_id))?;

            {
                let run = run_handle.lock().await;
                if run.status.is_terminal() {
                    return Ok(());
                }
            }

            let next_step_id = {
                let executions = self.executions.lock();
                let exec = executions.get(&run_id).ok_or(EngineError::UnknownRun(run_id))?;
                exec.flattened.get(exec.next_step).copied()
            };

            let Some(step_id) = next_step_id else {
                let mut run = run_handle.lock().await;
                if !run.status.is_terminal() {
                    run.status = RunStatus::Completed;
                    run.completed_at = Some(self.clock.now());
                    self.metrics.record_run_finished(true);
                    self.audit.record(AuditEntry {
                        timestamp: self.clock.now(),
                        run_id,
                        step_id: None,
                        kind: "workflow.run_completed".into(),
                        detail: String::new(),
                    });
                }
                drop(run);
                self.deactivate(run_id).await;
                return Ok(());
            };

            {
                let mut run = run_handle.lock().await;
                run.status = RunStatus::Running;
            }

            self.audit.record(AuditEntry {
                timestamp: self.clock.now(),
                run_id,
                step_id: Some(step_id),
                kind: "workflow.step_started".into(),
                detail: String::new(),
            });

            let outcome = self.run_step(run_id, &run_handle, step_id).await;

            match outcome {
                StepOutcome::Waiting => {
                    return Ok(());
                }
                StepOutcome::Skipped(reason) => {
                    self.audit.record(AuditEntry {
                        timestamp: self.clock.now(),
                        run_id,
                        step_id: Some(step_id),
                        kind: "workflow.step_skipped".into(),
                        detail: reason,
                    });
                }
                StepOutcome::Completed(_) => {
                    self.audit.record(AuditEntry {
                        timestamp: self.clock.now(),
                        run_id,
                        step_id: Some(step_id),
                        kind: "workflow.step_completed".into(),
                        detail: String::new(),
                    });
                }
                StepOutcome::Failed(reason) => {
                    let mut run = run_handle.lock().await;
                    run.status = RunStatus::Failed;
                    run.error = Some(reason.clone());
                    run.completed_at = Some(self.clock.now());
                    drop(run);
                    self.metrics.record_run_finished(false);
                    self.audit.record(AuditEntry {
                        timestamp: self.clock.now(),
                        run_id,
                        step_id: Some(step_id),
                        kind: "workflow.run_failed".into(),
                        detail: reason,
                    });
                    self.deactivate(run_id).await;
                    return Ok(());
                }
            }

            // Elapsed-time check, after every step completion.
            let timed_out = {
                let executions = self.executions.lock();
                let exec = executions.get(&run_id).ok_or(EngineError::UnknownRun(run_id))?;
                exec.workflow.settings.max_execution_time_ms
            };
            if let Some(max_ms) = timed_out {
                let run = run_handle.lock().await;
                let elapsed = (self.clock.now() - run.started_at).num_milliseconds().max(0) as u64;
                drop(run);
                if elapsed > max_ms {
                    let mut run = run_handle.lock().await;
                    run.status = RunStatus::TimedOut;
                    run.error = Some("EXECUTION_TIMEOUT".into());
                    run.completed_at = Some(self.clock.now());
                    drop(run);
                    self.metrics.record_run_finished(false);
                    self.audit.record(AuditEntry {
                        timestamp: self.clock.now(),
                        run_id,
                        step_id: None,
                        kind: "workflow.run_timed_out".into(),
                        detail: "EXECUTION_TIMEOUT".into(),
                    });
                    self.deactivate(run_id).await;
                    return Ok(());
                }
            }

            let mut executions = self.executions.lock();
            if let Some(exec) = executions.get_mut(&run_id) {
                exec.next_step += 1;
            }
        }
    }

    async fn run_step(&self, run_id: RunId, run_handle: &Arc<AsyncMutex<Run>>, step_id: StepId) -> StepOutcome {
        let step = {
            let executions = self.executions.lock();
            let Some(exec) = executions.get(&run_id) else {
                return StepOutcome::Failed("run execution state missing".into());
            };
            let Some(step) = exec.workflow.step(step_id) else {
                return StepOutcome::Failed("step definition missing".into());
            };
            step.clone()
        };

        {
            let run = run_handle.lock().await;
            if let Some(result) = run.step_results.get(&step_id) {
                match result.status {
                    StepStatus::Completed => {
                        return StepOutcome::Completed(result.output.clone().unwrap_or(Value::Null));
                    }
                    StepStatus::Skipped => return StepOutcome::Skipped(result.skip_reason.clone().unwrap_or_default()),
                    StepStatus::Failed => return StepOutcome::Failed(result.error.clone().unwrap_or_default()),
                    _ => {}
                }
            }
        }

        let now = self.clock.now();
        {
            let mut run = run_handle.lock().await;
            let _ = run.result_mut(step_id, now);
        }

        if !conditions_hold(&step, run_handle).await {
            return self.skip_step(run_handle, step_id, now, "Conditions not met".into()).await;
        }

        if let Some(key) = &step.settings.idempotency_key {
            if self.completed_idempotency_keys.lock().contains(key) {
                return self
                    .skip_step(run_handle, step_id, now, "Idempotency key already processed".into())
                    .await;
            }
        }

        if let Action::Approval {
            approver_ids,
            timeout_ms,
            min_approvals,
            escalation_user_ids,
            ..
        } = &step.action
        {
            return self
                .run_approval_step(
                    run_id,
                    run_handle,
                    step_id,
                    approver_ids.clone(),
                    *min_approvals,
                    *timeout_ms,
                    escalation_user_ids.clone(),
                )
                .await;
        }

        self.run_retryable_step(run_id, run_handle, step_id, &step).await
    }

    async fn skip_step(&self, run_handle: &Arc<AsyncMutex<Run>>, step_id: StepId, now: DateTime<Utc>, reason: String) -> StepOutcome {
        let mut run = run_handle.lock().await;
        let result = run.result_mut(step_id, now);
        result.status = StepStatus::Skipped;
        result.skip_reason = Some(reason.clone());
        result.completed_at = Some(now);
        StepOutcome::Skipped(reason)
    }

    async fn run_approval_step(
        &self,
        run_id: RunId,
        run_handle: &Arc<AsyncMutex<Run>>,
        step_id: StepId,
        approver_ids: Vec<String>,
        min_approvals: u32,
        timeout_ms: u64,
        escalation_user_ids: Vec<String>,
    ) -> StepOutcome {
        let workflow_id = {
            let run = run_handle.lock().await;
            run.workflow_id
        };
        let gate_id =
            self.approvals
                .request_or_get(run_id, step_id, workflow_id, approver_ids, min_approvals, timeout_ms, escalation_user_ids);

        let first_time = {
            let run = run_handle.lock().await;
            run.step_results.get(&step_id).map(|r| r.status == StepStatus::Pending).unwrap_or(true)
        };
        if first_time {
            self.audit.record(AuditEntry {
                timestamp: self.clock.now(),
                run_id,
                step_id: Some(step_id),
                kind: "workflow.approval_requested".into(),
                detail: gate_id.to_string(),
            });
        }

        match self.approvals.status(gate_id) {
            Some(ApprovalStatus::Approved) => {
                let now = self.clock.now();
                let mut run = run_handle.lock().await;
                let output = serde_json::json!({ "approved": true, "approvalId": gate_id });
                let result = run.result_mut(step_id, now);
                result.status = StepStatus::Completed;
                result.output = Some(output.clone());
                result.completed_at = Some(now);
                StepOutcome::Completed(output)
            }
            Some(ApprovalStatus::Rejected) | Some(ApprovalStatus::Expired) => {
                let now = self.clock.now();
                let reason = "approval rejected or expired".to_string();
                let mut run = run_handle.lock().await;
                let result = run.result_mut(step_id, now);
                result.status = StepStatus::Failed;
                result.error = Some(reason.clone());
                result.completed_at = Some(now);
                StepOutcome::Failed(reason)
            }
            Some(ApprovalStatus::Pending) | Some(ApprovalStatus::Escalated) | None => {
                let now = self.clock.now();
                let mut run = run_handle.lock().await;
                let result = run.result_mut(step_id, now);
                result.status = StepStatus::Running;
                StepOutcome::Waiting
            }
        }
    }

    async fn run_retryable_step(
        &self,
        run_id: RunId,
        run_handle: &Arc<AsyncMutex<Run>>,
        step_id: StepId,
        step: &StepDefinition,
    ) -> StepOutcome {
        let mut attempt: u32 = 1;
        loop {
            {
                let now = self.clock.now();
                let mut run = run_handle.lock().await;
                let result = run.result_mut(step_id, now);
                result.status = StepStatus::Running;
            }

            let result = {
                let mut run = run_handle.lock().await;
                let mut ctx = ActionContext::new(&mut run.context.variables);
                self.registry.execute(&step.action, &mut ctx).await
            };
            self.metrics.record_step_executed(attempt > 1);

            match result {
                Ok(value) => {
                    let now = self.clock.now();
                    let mut run = run_handle.lock().await;
                    let key = step.output_key.clone().unwrap_or_else(|| step_id.to_string());
                    run.context.step_outputs.insert(key, value.clone());
                    let result = run.result_mut(step_id, now);
                    result.status = StepStatus::Completed;
                    result.output = Some(value.clone());
                    result.completed_at = Some(now);
                    result.retry_count = attempt - 1;
                    drop(run);
                    if let Some(key) = &step.settings.idempotency_key {
                        self.completed_idempotency_keys.lock().insert(key.clone());
                    }
                    return StepOutcome::Completed(value);
                }
                Err(e) if attempt <= step.settings.retry_attempts => {
                    self.audit.record(AuditEntry {
                        timestamp: self.clock.now(),
                        run_id,
                        step_id: Some(step_id),
                        kind: "workflow.step_retrying".into(),
                        detail: e.to_string(),
                    });
                    let delay = step.settings.delay_for_attempt(attempt);
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => {
                    let now = self.clock.now();
                    let retry_count = attempt - 1;
                    if step.settings.skip_on_failure {
                        let mut run = run_handle.lock().await;
                        let result = run.result_mut(step_id, now);
                        result.status = StepStatus::Skipped;
                        result.skip_reason = Some(e.to_string());
                        result.completed_at = Some(now);
                        result.retry_count = retry_count;
                        return StepOutcome::Skipped(e.to_string());
                    }
                    let mut run = run_handle.lock().await;
                    let result = run.result_mut(step_id, now);
                    result.status = StepStatus::Failed;
                    result.error = Some(e.to_string());
                    result.completed_at = Some(now);
                    result.retry_count = retry_count;
                    return StepOutcome::Failed(e.to_string());
                }
            }
        }
    }
}

async fn conditions_hold(step: &StepDefinition, run_handle: &Arc<AsyncMutex<Run>>) -> bool {
    if step.conditions.is_empty() {
        return true;
    }
    let run = run_handle.lock().await;
    let ctx = nchat_trigger::Context::new(run.context.as_value());
    step.conditions.iter().all(|c| c.evaluate(&ctx))
}

fn resolve_inputs(workflow: &WorkflowDefinition, mut supplied: Map<String, Value>) -> Result<Map<String, Value>, EngineError> {
    let mut resolved = Map::new();
    for declared in &workflow.input_schema {
        if let Some(value) = supplied.remove(&declared.name) {
            resolved.insert(declared.name.clone(), value);
        } else if let Some(default) = &declared.default_value {
            resolved.insert(declared.name.clone(), default.clone());
        } else if declared.required {
            return Err(EngineError::MissingInput(declared.name.clone()));
        }
    }
    // Inputs not named by the schema pass through unchanged, so callers
    // using a workflow without a declared schema still get their
    // payload.
    for (key, value) in supplied {
        resolved.entry(key).or_insert(value);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InputDeclaration, StepSettings, WorkflowSettings};
    use nchat_telemetry::NoOpMetrics;
    use nchat_trigger::{TriggerDefinition, TriggerKind};
    use nchat_types::{Clock as _, FixedClock, StepId, WorkflowId};
    use serde_json::json;

    fn engine() -> (ExecutionEngine, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let engine = ExecutionEngine::new(ActionRegistry::new(), clock.clone(), Arc::new(NoOpMetrics));
        (engine, clock)
    }

    fn step(id: StepId, depends_on: Vec<StepId>, action: Action) -> StepDefinition {
        StepDefinition {
            id,
            name: format!("step-{id}"),
            depends_on,
            action,
            conditions: vec![],
            settings: StepSettings::default(),
            input_mapping: None,
            output_key: None,
        }
    }

    fn workflow(steps: Vec<StepDefinition>) -> WorkflowDefinition {
        WorkflowDefinition {
            id: WorkflowId::new(),
            name: "Wf".into(),
            version: 1,
            trigger: TriggerDefinition {
                kind: TriggerKind::Manual {
                    allowed_user_ids: vec![],
                    allowed_roles: vec![],
                },
                conditions: vec![],
            },
            steps,
            enabled: true,
            input_schema: vec![],
            settings: WorkflowSettings::default(),
            required_scopes: vec![],
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn linear_workflow_runs_to_completion() {
        let (engine, _clock) = engine();
        let a = StepId::new();
        let b = StepId::new();
        let wf = workflow(vec![
            step(a, vec![], Action::SetVariable { name: "x".into(), value: json!(1) }),
            step(b, vec![a], Action::SetVariable { name: "y".into(), value: json!(2) }),
        ]);
        let run_id = engine.start_run(wf, Map::new(), json!({})).await.unwrap();
        let run = engine.get_run(run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.context.variables.get("x").unwrap(), 1);
        assert_eq!(run.context.variables.get("y").unwrap(), 2);
        assert_eq!(engine.audit_log().for_run(run_id).iter().filter(|e| e.kind == "workflow.run_started").count(), 1);
        assert_eq!(engine.audit_log().for_run(run_id).iter().filter(|e| e.kind == "workflow.run_completed").count(), 1);
    }

    #[tokio::test]
    async fn unhandled_action_fails_the_run() {
        let (engine, _clock) = engine();
        let a = StepId::new();
        let wf = workflow(vec![step(
            a,
            vec![],
            Action::SendMessage { channel_id: "c1".into(), content: "hi".into() },
        )]);
        let run_id = engine.start_run(wf, Map::new(), json!({})).await.unwrap();
        let run = engine.get_run(run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn unmet_conditions_skip_the_step() {
        let (engine, _clock) = engine();
        let a = StepId::new();
        let mut gated = step(a, vec![], Action::SetVariable { name: "x".into(), value: json!(1) });
        gated.conditions = vec![nchat_trigger::Condition {
            field: "inputs.shouldRun".into(),
            operator: nchat_trigger::ConditionOperator::Equals,
            value: Some(json!(true)),
        }];
        let wf = workflow(vec![gated]);
        let run_id = engine.start_run(wf, Map::new(), json!({})).await.unwrap();
        let run = engine.get_run(run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        let result = run.step_results.get(&a).unwrap();
        assert_eq!(result.status, StepStatus::Skipped);
        assert_eq!(result.skip_reason.as_deref(), Some("Conditions not met"));
    }

    #[tokio::test]
    async fn idempotency_key_skips_second_occurrence() {
        let (engine, _clock) = engine();
        let mut settings = StepSettings::default();
        settings.idempotency_key = Some("send-welcome".into());

        let a = StepId::new();
        let mut first_step = step(a, vec![], Action::SetVariable { name: "x".into(), value: json!(1) });
        first_step.settings = settings.clone();
        let run_id_1 = engine.start_run(workflow(vec![first_step]), Map::new(), json!({})).await.unwrap();
        let run_1 = engine.get_run(run_id_1).await.unwrap();
        assert_eq!(run_1.step_results.get(&a).unwrap().status, StepStatus::Completed);

        let b = StepId::new();
        let mut second_step = step(b, vec![], Action::SetVariable { name: "x".into(), value: json!(2) });
        second_step.settings = settings;
        let run_id_2 = engine.start_run(workflow(vec![second_step]), Map::new(), json!({})).await.unwrap();
        let run_2 = engine.get_run(run_id_2).await.unwrap();
        let result_2 = run_2.step_results.get(&b).unwrap();
        assert_eq!(result_2.status, StepStatus::Skipped);
        assert_eq!(result_2.skip_reason.as_deref(), Some("Idempotency key already processed"));
    }

    #[tokio::test]
    async fn missing_required_input_is_rejected() {
        let (engine, _clock) = engine();
        let mut wf = workflow(vec![step(StepId::new(), vec![], Action::SetVariable { name: "x".into(), value: json!(1) })]);
        wf.input_schema = vec![InputDeclaration { name: "must_have".into(), required: true, default_value: None }];
        let err = engine.start_run(wf, Map::new(), json!({})).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingInput(field) if field == "must_have"));
    }

    #[tokio::test]
    async fn invalid_workflow_is_rejected_before_running() {
        let (engine, _clock) = engine();
        let wf = workflow(vec![]);
        let err = engine.start_run(wf, Map::new(), json!({})).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidDefinition(_)));
    }

    #[tokio::test]
    async fn concurrency_limit_rejects_extra_runs() {
        let (engine, _clock) = engine();
        let mut wf = workflow(vec![step(StepId::new(), vec![], Action::Delay { duration_ms: 0 })]);
        wf.settings.max_concurrent_executions = Some(0);
        let err = engine.start_run(wf, Map::new(), json!({})).await.unwrap_err();
        assert!(matches!(err, EngineError::ConcurrencyLimitExceeded(0)));
    }

    #[tokio::test]
    async fn approval_gated_step_pauses_then_resumes_on_approve() {
        let (engine, _clock) = engine();
        let a = StepId::new();
        let gated = step(
            a,
            vec![],
            Action::Approval {
                approver_ids: vec!["alice".into()],
                message: "ok to proceed?".into(),
                timeout_ms: 60_000,
                min_approvals: 1,
                escalation_user_ids: vec![],
            },
        );
        let wf = workflow(vec![gated]);
        let run_id = engine.start_run(wf, Map::new(), json!({})).await.unwrap();

        let run = engine.get_run(run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.step_results.get(&a).unwrap().status, StepStatus::Running);

        let pending = engine
            .approvals()
            .get(engine.approvals().request_or_get(run_id, a, run.workflow_id, vec!["alice".into()], 1, 60_000, vec![]))
            .unwrap();
        engine.approvals().respond(pending.id, "alice", true, None).unwrap();
        engine.resume_run(run_id).await.unwrap();

        let run = engine.get_run(run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.step_results.get(&a).unwrap().status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn retry_run_creates_new_run_with_incremented_count() {
        let (engine, _clock) = engine();
        let a = StepId::new();
        let wf = workflow(vec![step(
            a,
            vec![],
            Action::SendMessage { channel_id: "c1".into(), content: "hi".into() },
        )]);
        let run_id = engine.start_run(wf.clone(), Map::new(), json!({})).await.unwrap();
        let run = engine.get_run(run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);

        let retried_id = engine.retry_run(run_id, wf).await.unwrap();
        let retried = engine.get_run(retried_id).await.unwrap();
        assert_eq!(retried.retry_count, 1);
    }
}
