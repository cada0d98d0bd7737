//! End-to-end scenarios exercising the execution engine as a whole,
//! covering a representative run of each documented behavior: a plain
//! linear run, a conditional skip, a retrying step, and an approval
//! gate that escalates before resolving.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use nchat_telemetry::NoOpMetrics;
use nchat_trigger::{Condition, ConditionOperator, TriggerDefinition, TriggerKind};
use nchat_types::{FixedClock, StepId, WorkflowId};
use nchat_workflow::{
    Action, ActionContext, ActionError, ActionHandler, ActionRegistry, ExecutionEngine, RetryBackoff, RunStatus,
    StepDefinition, StepSettings, StepStatus, WorkflowDefinition, WorkflowSettings,
};
use serde_json::{json, Map, Value};

fn base_workflow(steps: Vec<StepDefinition>) -> WorkflowDefinition {
    WorkflowDefinition {
        id: WorkflowId::new(),
        name: "Scenario Workflow".into(),
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

fn base_step(id: StepId, action: Action) -> StepDefinition {
    StepDefinition {
        id,
        name: format!("step-{id}"),
        depends_on: vec![],
        action,
        conditions: vec![],
        settings: StepSettings::default(),
        input_mapping: None,
        output_key: None,
    }
}

/// S1 — Simple manual run. One `send_message` step, `manual` trigger:
/// `start_run` yields `status=completed`, one step result `completed`,
/// and exactly one `run_started`/`run_completed` audit entry.
#[tokio::test]
async fn s1_simple_manual_run_completes() {
    let mut registry = ActionRegistry::new();
    registry.register("send_message", Arc::new(EchoHandler));
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let engine = ExecutionEngine::new(registry, clock, Arc::new(NoOpMetrics));

    let step_id = StepId::new();
    let wf = base_workflow(vec![base_step(
        step_id,
        Action::SendMessage { channel_id: "c1".into(), content: "Hi".into() },
    )]);

    let run_id = engine.start_run(wf, Map::new(), json!({})).await.unwrap();
    let run = engine.get_run(run_id).await.unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.step_results.len(), 1);
    assert_eq!(run.step_results.get(&step_id).unwrap().status, StepStatus::Completed);

    let entries = engine.audit_log().for_run(run_id);
    assert_eq!(entries.iter().filter(|e| e.kind == "workflow.run_started").count(), 1);
    assert_eq!(entries.iter().filter(|e| e.kind == "workflow.run_completed").count(), 1);
}

struct EchoHandler;
#[async_trait]
impl ActionHandler for EchoHandler {
    async fn execute(&self, _action: &Action, _ctx: &mut ActionContext<'_>) -> Result<Value, ActionError> {
        Ok(json!({"sent": true}))
    }
}

/// S2 — Conditional skip. A step gated on `inputs.shouldRun == true`
/// run with `inputs={shouldRun:false}` is skipped with a reason
/// mentioning "Conditions not met".
#[tokio::test]
async fn s2_unmet_condition_skips_the_step() {
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let engine = ExecutionEngine::new(ActionRegistry::new(), clock, Arc::new(NoOpMetrics));

    let step_id = StepId::new();
    let mut gated = base_step(step_id, Action::SetVariable { name: "x".into(), value: json!(1) });
    gated.conditions = vec![Condition {
        field: "inputs.shouldRun".into(),
        operator: ConditionOperator::Equals,
        value: Some(json!(true)),
    }];
    let wf = base_workflow(vec![gated]);

    let mut inputs = Map::new();
    inputs.insert("shouldRun".into(), json!(false));
    let run_id = engine.start_run(wf, inputs, json!({})).await.unwrap();
    let run = engine.get_run(run_id).await.unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    let result = run.step_results.get(&step_id).unwrap();
    assert_eq!(result.status, StepStatus::Skipped);
    assert!(result.skip_reason.as_deref().unwrap().contains("Conditions not met"));
}

/// S3 — Retry and succeed. A handler that fails twice then succeeds,
/// with `retryAttempts=3, retryBackoff=exponential, retryDelayMs=100`,
/// ends the run `completed` with the step's `retryCount=2`.
struct FlakyHandler {
    remaining_failures: AtomicU32,
}
#[async_trait]
impl ActionHandler for FlakyHandler {
    async fn execute(&self, _action: &Action, _ctx: &mut ActionContext<'_>) -> Result<Value, ActionError> {
        if self.remaining_failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok() {
            Err(ActionError::Retryable("simulated transient failure".into()))
        } else {
            Ok(json!({"ok": true}))
        }
    }
}

#[tokio::test]
async fn s3_retries_then_succeeds() {
    let mut registry = ActionRegistry::new();
    registry.register("http_request", Arc::new(FlakyHandler { remaining_failures: AtomicU32::new(2) }));
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let engine = ExecutionEngine::new(registry, clock, Arc::new(NoOpMetrics));

    let step_id = StepId::new();
    let mut step = base_step(step_id, Action::HttpRequest { url: "https://example.com".into(), method: "GET".into() });
    step.settings = StepSettings {
        retry_attempts: 3,
        retry_backoff: RetryBackoff::Exponential,
        retry_delay_ms: 1,
        ..StepSettings::default()
    };
    let wf = base_workflow(vec![step]);

    let run_id = engine.start_run(wf, Map::new(), json!({})).await.unwrap();
    let run = engine.get_run(run_id).await.unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    let result = run.step_results.get(&step_id).unwrap();
    assert_eq!(result.status, StepStatus::Completed);
    assert_eq!(result.retry_count, 2);
}

/// S4 — Approval quorum with escalation. A pending approval whose
/// original window elapses escalates; the escalation user approving
/// afterward resolves the step as `completed`.
#[tokio::test]
async fn s4_approval_escalates_then_resolves() {
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let engine = ExecutionEngine::new(ActionRegistry::new(), clock.clone(), Arc::new(NoOpMetrics));

    let step_id = StepId::new();
    let step = base_step(
        step_id,
        Action::Approval {
            approver_ids: vec!["u1".into(), "u2".into()],
            message: "please approve".into(),
            timeout_ms: 60_000,
            min_approvals: 2,
            escalation_user_ids: vec!["mgr".into()],
        },
    );
    let wf = base_workflow(vec![step]);

    let run_id = engine.start_run(wf, Map::new(), json!({})).await.unwrap();
    let run = engine.get_run(run_id).await.unwrap();
    assert_eq!(run.status, RunStatus::Running);

    clock.advance(chrono::Duration::minutes(2));
    let escalated = engine.approvals().process_expired();
    assert_eq!(escalated.len(), 1);
    let gate_id = escalated[0];
    assert_eq!(engine.approvals().status(gate_id), Some(nchat_workflow::ApprovalStatus::Escalated));

    engine.approvals().respond(gate_id, "mgr", true, None).unwrap();
    engine.resume_run(run_id).await.unwrap();

    let run = engine.get_run(run_id).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.step_results.get(&step_id).unwrap().status, StepStatus::Completed);
}
