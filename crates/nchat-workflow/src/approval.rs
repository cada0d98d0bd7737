//! Human approval gates: quorum tracking and timeout/escalation for
//! `approval` steps.
//!
//! A gate's timeout resets whenever it escalates: escalating hands the
//! decision to a new set of approvers, and they deserve a fresh window
//! rather than inheriting however much of the original timeout happened
//! to be left.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nchat_types::{ApprovalId, Clock, RunId, StepId, WorkflowId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::ApprovalError;

/// Current state of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting enough responses to reach quorum.
    Pending,
    /// `min_approvals` approvals were recorded.
    Approved,
    /// Quorum became mathematically unreachable.
    Rejected,
    /// The decision window elapsed with no escalation path, or the
    /// escalation window itself elapsed.
    Expired,
    /// The original window elapsed and responsibility passed to
    /// `escalation_user_ids`.
    Escalated,
}

impl ApprovalStatus {
    fn is_terminal(self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::Rejected | ApprovalStatus::Expired)
    }
}

/// A single approver's response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    /// The responding user's id.
    pub user_id: String,
    /// `true` to approve, `false` to reject.
    pub approved: bool,
    /// Optional free-text justification.
    pub comment: Option<String>,
    /// When the response was recorded.
    pub responded_at: DateTime<Utc>,
}

/// A pending (or resolved) human decision blocking a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    /// Unique id of this request.
    pub id: ApprovalId,
    /// The run it blocks.
    pub run_id: RunId,
    /// The step it blocks.
    pub step_id: StepId,
    /// The workflow the run belongs to.
    pub workflow_id: WorkflowId,
    /// Users eligible to respond before escalation.
    pub approver_ids: Vec<String>,
    /// Approvals required for the gate to open.
    pub min_approvals: u32,
    /// Decision window in milliseconds, measured from `created_at`
    /// (or from the escalation instant, once escalated).
    pub timeout_ms: u64,
    /// Current status.
    pub status: ApprovalStatus,
    /// Responses recorded so far.
    pub responses: Vec<ApprovalResponse>,
    /// Users who may respond once escalated.
    pub escalation_user_ids: Vec<String>,
    /// Whether this request has already escalated once.
    pub escalated: bool,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the deadline for the current window elapses.
    deadline: DateTime<Utc>,
    /// When the request reached a terminal status, if it has.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Tracks approval requests and resolves them via quorum, timeout, and
/// escalation.
pub struct ApprovalGateManager {
    clock: Arc<dyn Clock>,
    requests: Mutex<HashMap<ApprovalId, ApprovalRequest>>,
    by_run_step: Mutex<HashMap<(RunId, StepId), ApprovalId>>,
}

impl ApprovalGateManager {
    /// Build a manager using `clock` as its source of time.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            requests: Mutex::new(HashMap::new()),
            by_run_step: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new request for `(run_id, step_id)`, or return the
    /// existing one if this key already has a request (idempotent
    /// creation, per the `(runId, stepId)` uniqueness invariant).
    #[allow(clippy::too_many_arguments)]
    pub fn request_or_get(
        &self,
        run_id: RunId,
        step_id: StepId,
        workflow_id: WorkflowId,
        approver_ids: Vec<String>,
        min_approvals: u32,
        timeout_ms: u64,
        escalation_user_ids: Vec<String>,
    ) -> ApprovalId {
        let mut by_run_step = self.by_run_step.lock();
        if let Some(existing) = by_run_step.get(&(run_id, step_id)) {
            return *existing;
        }
        let now = self.clock.now();
        let id = ApprovalId::new();
        self.requests.lock().insert(
            id,
            ApprovalRequest {
                id,
                run_id,
                step_id,
                workflow_id,
                approver_ids,
                min_approvals,
                timeout_ms,
                status: ApprovalStatus::Pending,
                responses: vec![],
                escalation_user_ids,
                escalated: false,
                created_at: now,
                deadline: now + chrono::Duration::milliseconds(timeout_ms as i64),
                resolved_at: None,
            },
        );
        by_run_step.insert((run_id, step_id), id);
        id
    }

    /// Look up a request by id, applying timeout processing first so
    /// the returned snapshot reflects the current time.
    pub fn get(&self, id: ApprovalId) -> Option<ApprovalRequest> {
        let mut requests = self.requests.lock();
        let request = requests.get_mut(&id)?;
        self.expire_if_due(request);
        Some(request.clone())
    }

    /// Current status of a request.
    pub fn status(&self, id: ApprovalId) -> Option<ApprovalStatus> {
        self.get(id).map(|r| r.status)
    }

    /// Record `user_id`'s decision. Recomputes quorum afterward:
    /// approved if `min_approvals` is reached, rejected if it becomes
    /// mathematically unreachable, otherwise still pending.
    pub fn respond(
        &self,
        id: ApprovalId,
        user_id: &str,
        approved: bool,
        comment: Option<String>,
    ) -> Result<ApprovalStatus, ApprovalError> {
        let mut requests = self.requests.lock();
        let request = requests.get_mut(&id).ok_or(ApprovalError::NotFound(id))?;
        self.expire_if_due(request);

        if request.status.is_terminal() {
            return Err(ApprovalError::AlreadyTerminal(id));
        }
        let eligible = request.approver_ids.iter().any(|u| u == user_id)
            || (request.escalated && request.escalation_user_ids.iter().any(|u| u == user_id));
        if !eligible {
            return Err(ApprovalError::UserNotAuthorized(user_id.to_string()));
        }
        if request.responses.iter().any(|r| r.user_id == user_id) {
            return Err(ApprovalError::AlreadyResponded(user_id.to_string()));
        }

        let now = self.clock.now();
        request.responses.push(ApprovalResponse {
            user_id: user_id.to_string(),
            approved,
            comment,
            responded_at: now,
        });

        let approvals = request.responses.iter().filter(|r| r.approved).count() as u32;
        let total_eligible = request.approver_ids.len() as u32
            + if request.escalated { request.escalation_user_ids.len() as u32 } else { 0 };
        let responded = request.responses.len() as u32;
        let remaining_potential = total_eligible.saturating_sub(responded);

        if approvals >= request.min_approvals {
            request.status = ApprovalStatus::Approved;
            request.resolved_at = Some(now);
        } else if approvals + remaining_potential < request.min_approvals {
            request.status = ApprovalStatus::Rejected;
            request.resolved_at = Some(now);
        }

        Ok(request.status)
    }

    /// Process every pending request whose deadline has elapsed:
    /// escalate if it has an escalation path it hasn't used yet,
    /// otherwise expire it. Returns the ids that changed status.
    pub fn process_expired(&self) -> Vec<ApprovalId> {
        let now = self.clock.now();
        let mut requests = self.requests.lock();
        let mut changed = vec![];
        for request in requests.values_mut() {
            if request.status != ApprovalStatus::Pending || now < request.deadline {
                continue;
            }
            if !request.escalated && !request.escalation_user_ids.is_empty() {
                request.escalated = true;
                request.status = ApprovalStatus::Escalated;
                request.deadline = now + chrono::Duration::milliseconds(request.timeout_ms as i64);
            } else {
                request.status = ApprovalStatus::Expired;
                request.resolved_at = Some(now);
            }
            changed.push(request.id);
        }
        changed
    }

    fn expire_if_due(&self, request: &mut ApprovalRequest) {
        if request.status != ApprovalStatus::Pending && request.status != ApprovalStatus::Escalated {
            return;
        }
        let now = self.clock.now();
        if now < request.deadline {
            return;
        }
        if request.status == ApprovalStatus::Pending && !request.escalated && !request.escalation_user_ids.is_empty() {
            request.escalated = true;
            request.status = ApprovalStatus::Escalated;
            request.deadline = now + chrono::Duration::milliseconds(request.timeout_ms as i64);
        } else {
            request.status = ApprovalStatus::Expired;
            request.resolved_at = Some(now);
        }
    }
}
