//! Error types for workflow definition, ordering, approval, and execution.

use nchat_types::{RunId, StepId, ValidationError};
use thiserror::Error;

/// Failure computing a workflow's execution order.
#[derive(Debug, Error)]
pub enum OrderingError {
    /// The dependency graph contains a cycle; the listed steps could
    /// never be scheduled.
    #[error("cycle detected among steps: {0:?}")]
    CycleDetected(Vec<StepId>),
    /// A step's `depends_on` names a step id that isn't defined.
    #[error("step {0} depends on unknown step {1}")]
    UnknownDependency(StepId, StepId),
}

/// Failure running a single step's action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No handler is registered for the action's kind.
    #[error("no handler registered for action kind '{0}'")]
    Unhandled(String),
    /// The action's parameters were malformed for the handler that ran.
    #[error("invalid action input: {0}")]
    InvalidInput(String),
    /// The handler's underlying operation failed and may succeed on retry.
    #[error("action failed (retryable): {0}")]
    Retryable(String),
    /// The handler's underlying operation failed and retrying won't help.
    #[error("action failed (permanent): {0}")]
    Permanent(String),
}

/// Failure responding to or escalating an approval request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    /// No request exists for the given id.
    #[error("no approval request {0}")]
    NotFound(nchat_types::ApprovalId),
    /// The request has already reached a terminal status.
    #[error("approval request {0} is already terminal")]
    AlreadyTerminal(nchat_types::ApprovalId),
    /// The responding user is not an eligible approver.
    #[error("user '{0}' is not an eligible approver for this request")]
    UserNotAuthorized(String),
    /// The responding user already recorded a response.
    #[error("user '{0}' has already responded")]
    AlreadyResponded(String),
}

/// Failure starting or driving a workflow run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The workflow definition did not pass validation.
    #[error("workflow definition invalid: {0:?}")]
    InvalidDefinition(Vec<ValidationError>),
    /// The workflow's step graph could not be ordered.
    #[error(transparent)]
    Ordering(#[from] OrderingError),
    /// Too many runs of this workflow are already active.
    #[error("concurrency limit exceeded: {0} runs already active")]
    ConcurrencyLimitExceeded(usize),
    /// A required input was not supplied and has no default.
    #[error("missing required input '{0}'")]
    MissingInput(String),
    /// The referenced run does not exist.
    #[error("unknown run {0}")]
    UnknownRun(RunId),
    /// An approval-gate operation failed.
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    /// `retry_run` was called on a run that isn't `failed`.
    #[error("run {0} is not in a failed state and cannot be retried")]
    NotRetryable(RunId),
}
