//! Structural validation of a [`WorkflowDefinition`] prior to scheduling.

use std::collections::HashSet;

use nchat_cron::CronExpression;
use nchat_trigger::TriggerKind;
use nchat_types::ValidationError;
use once_cell_name::name_regex;

use crate::errors::OrderingError;
use crate::graph::topological_schedule;
use crate::model::{Action, WorkflowDefinition};

const ALLOWED_WEBHOOK_METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

mod once_cell_name {
    use regex::Regex;
    use std::sync::OnceLock;

    static NAME_RE: OnceLock<Regex> = OnceLock::new();

    pub fn name_regex() -> &'static Regex {
        NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9 _-]*$").expect("static pattern is valid"))
    }
}

const MAX_STEPS: usize = 50;
const MAX_NAME_LEN: usize = 128;
const MAX_TAGS: usize = 20;
const MAX_APPROVAL_TIMEOUT_MS: u64 = 86_400_000;
const MAX_DELAY_MS: u64 = 3_600_000;

/// Validate `workflow`, returning every problem found rather than
/// stopping at the first one, so an author can fix a definition in one
/// pass.
pub fn validate(workflow: &WorkflowDefinition) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if workflow.name.is_empty() || workflow.name.len() > MAX_NAME_LEN || !name_regex().is_match(&workflow.name) {
        errors.push(ValidationError::InvalidValue {
            field: "name".into(),
            reason: "must be 1-128 chars matching ^[A-Za-z][A-Za-z0-9 _-]*$".into(),
        });
    }

    if workflow.steps.is_empty() || workflow.steps.len() > MAX_STEPS {
        errors.push(ValidationError::InvalidValue {
            field: "steps".into(),
            reason: format!("must contain 1 to {MAX_STEPS} steps"),
        });
    }

    if workflow.tags.len() > MAX_TAGS {
        errors.push(ValidationError::InvalidValue {
            field: "tags".into(),
            reason: format!("should not exceed {MAX_TAGS} entries"),
        });
    }

    let mut seen_ids = HashSet::new();
    let mut seen_names = HashSet::new();
    for step in &workflow.steps {
        if !seen_ids.insert(step.id) {
            errors.push(ValidationError::DuplicateIdentifier(step.id.to_string()));
        }
        if !seen_names.insert(step.name.clone()) {
            errors.push(ValidationError::DuplicateIdentifier(step.name.clone()));
        }
        if step.name.trim().is_empty() {
            errors.push(ValidationError::InvalidValue {
                field: format!("steps[{}].name", step.id),
                reason: "must not be empty".into(),
            });
        }
        validate_action(step.id.to_string(), &step.action, &mut errors);
    }

    match topological_schedule(workflow) {
        Ok(_) => {}
        Err(OrderingError::CycleDetected(ids)) => {
            errors.push(ValidationError::CycleDetected(ids.iter().map(|id| id.to_string()).collect()));
        }
        Err(OrderingError::UnknownDependency(step, dep)) => {
            errors.push(ValidationError::UnresolvedReference(format!("{step} -> {dep}")));
        }
    }

    validate_trigger(&workflow.trigger.kind, &mut errors);

    errors
}

fn validate_trigger(kind: &TriggerKind, errors: &mut Vec<ValidationError>) {
    match kind {
        TriggerKind::Schedule { cron_expression, .. } => {
            if let Err(err) = CronExpression::parse(cron_expression) {
                errors.push(ValidationError::InvalidValue {
                    field: "trigger.schedule.cronExpression".into(),
                    reason: err.to_string(),
                });
            }
        }
        TriggerKind::Event { event_type, .. } => {
            if event_type.trim().is_empty() {
                errors.push(ValidationError::InvalidValue {
                    field: "trigger.event.eventType".into(),
                    reason: "must not be empty".into(),
                });
            }
        }
        TriggerKind::Webhook { methods, .. } => {
            if methods.is_empty()
                || !methods
                    .iter()
                    .all(|m| ALLOWED_WEBHOOK_METHODS.iter().any(|allowed| allowed.eq_ignore_ascii_case(m)))
            {
                errors.push(ValidationError::InvalidValue {
                    field: "trigger.webhook.methods".into(),
                    reason: format!(
                        "must be a non-empty subset of {}",
                        ALLOWED_WEBHOOK_METHODS.join(", ")
                    ),
                });
            }
        }
        TriggerKind::Manual { .. } => {}
    }
}

fn validate_action(step_label: String, action: &Action, errors: &mut Vec<ValidationError>) {
    match action {
        Action::SetVariable { name, .. } if name.trim().is_empty() => {
            errors.push(ValidationError::InvalidValue {
                field: format!("{step_label}.action.name"),
                reason: "must not be empty".into(),
            });
        }
        Action::Delay { duration_ms } if *duration_ms > MAX_DELAY_MS => {
            errors.push(ValidationError::InvalidValue {
                field: format!("{step_label}.action.durationMs"),
                reason: format!("must not exceed {MAX_DELAY_MS}"),
            });
        }
        Action::TransformData { output, template } => {
            if output.trim().is_empty() {
                errors.push(ValidationError::InvalidValue {
                    field: format!("{step_label}.action.output"),
                    reason: "must not be empty".into(),
                });
            }
            if template.is_empty() {
                errors.push(ValidationError::InvalidValue {
                    field: format!("{step_label}.action.template"),
                    reason: "must not be empty".into(),
                });
            }
        }
        Action::ConditionalBranch { branches, .. } if branches.is_empty() => {
            errors.push(ValidationError::InvalidValue {
                field: format!("{step_label}.action.branches"),
                reason: "must not be empty".into(),
            });
        }
        Action::Approval {
            timeout_ms,
            min_approvals,
            approver_ids,
            ..
        } => {
            if *timeout_ms > MAX_APPROVAL_TIMEOUT_MS {
                errors.push(ValidationError::InvalidValue {
                    field: format!("{step_label}.action.timeoutMs"),
                    reason: format!("must not exceed {MAX_APPROVAL_TIMEOUT_MS}"),
                });
            }
            if *min_approvals == 0 || (*min_approvals as usize) > approver_ids.len() {
                errors.push(ValidationError::InvalidValue {
                    field: format!("{step_label}.action.minApprovals"),
                    reason: "must be between 1 and the number of approvers".into(),
                });
            }
        }
        _ => {}
    }
}
