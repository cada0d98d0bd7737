//! Dependency graph construction and topological ordering for a
//! workflow's steps.
//!
//! Uses Kahn's algorithm: repeatedly peel off the set of steps whose
//! dependencies have all completed, forming one "parallel group" per
//! round. Within a round, ties are broken by the steps' original
//! declaration order in [`WorkflowDefinition::steps`] rather than by
//! sorting on a content hash — step order is author-controlled and
//! meaningful, so preserving it gives reproducible, readable schedules.

use std::collections::HashMap;

use nchat_types::StepId;

use crate::errors::OrderingError;
use crate::model::WorkflowDefinition;

/// One round of steps with no remaining unmet dependencies. Every step
/// in a group may execute concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelGroup {
    /// Index of this group within the schedule, starting at 0.
    pub index: usize,
    /// Steps that become runnable in this round, in declaration order.
    pub steps: Vec<StepId>,
}

/// A workflow's steps arranged into sequential parallel groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSchedule {
    /// Groups in execution order.
    pub groups: Vec<ParallelGroup>,
}

impl ExecutionSchedule {
    /// Total number of steps across all groups.
    pub fn step_count(&self) -> usize {
        self.groups.iter().map(|g| g.steps.len()).sum()
    }
}

/// Compute the execution schedule for `workflow` via Kahn's algorithm.
///
/// Returns [`OrderingError::UnknownDependency`] if a step names a
/// `depends_on` id that isn't defined in the workflow, and
/// [`OrderingError::CycleDetected`] if the remaining steps form a cycle.
pub fn topological_schedule(workflow: &WorkflowDefinition) -> Result<ExecutionSchedule, OrderingError> {
    if workflow.steps.is_empty() {
        return Ok(ExecutionSchedule { groups: vec![] });
    }

    let declared_order: HashMap<StepId, usize> =
        workflow.steps.iter().enumerate().map(|(i, s)| (s.id, i)).collect();

    // adjacency: step -> steps that depend on it
    let mut adjacency: HashMap<StepId, Vec<StepId>> = HashMap::new();
    let mut in_degree: HashMap<StepId, usize> = HashMap::new();

    for step in &workflow.steps {
        in_degree.entry(step.id).or_insert(0);
        for dep in &step.depends_on {
            if !declared_order.contains_key(dep) {
                return Err(OrderingError::UnknownDependency(step.id, *dep));
            }
            adjacency.entry(*dep).or_default().push(step.id);
            *in_degree.entry(step.id).or_insert(0) += 1;
        }
    }

    let mut queue: Vec<StepId> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(id, _)| *id)
        .collect();
    sort_by_declaration(&mut queue, &declared_order);

    let mut groups = Vec::new();
    let mut scheduled_count = 0;

    while !queue.is_empty() {
        let current_group = std::mem::take(&mut queue);
        scheduled_count += current_group.len();

        let mut next_queue = Vec::new();
        for step_id in &current_group {
            let Some(dependents) = adjacency.get(step_id) else {
                continue;
            };
            for dependent in dependents {
                let Some(degree) = in_degree.get_mut(dependent) else {
                    continue;
                };
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    next_queue.push(*dependent);
                }
            }
        }
        sort_by_declaration(&mut next_queue, &declared_order);

        groups.push(ParallelGroup {
            index: groups.len(),
            steps: current_group,
        });
        queue = next_queue;
    }

    if scheduled_count < workflow.steps.len() {
        let scheduled: std::collections::HashSet<StepId> =
            groups.iter().flat_map(|g| g.steps.iter().copied()).collect();
        let unscheduled = workflow
            .steps
            .iter()
            .map(|s| s.id)
            .filter(|id| !scheduled.contains(id))
            .collect();
        return Err(OrderingError::CycleDetected(unscheduled));
    }

    Ok(ExecutionSchedule { groups })
}

fn sort_by_declaration(ids: &mut [StepId], order: &HashMap<StepId, usize>) {
    ids.sort_by_key(|id| order[id]);
}
