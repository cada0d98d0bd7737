//! Entity-level cron schedules: tick-driven matching of registered
//! [`Schedule`]s against the current time, plus the lifecycle operations
//! (`create_schedule`, `pause`, `resume`, `remove`) that manage them.
//!
//! The scheduler never fires anything itself — [`Scheduler::tick`]
//! returns the set of [`ScheduleId`]s whose expression matches `now`, and
//! the caller (the trigger engine) decides what to do with them and
//! reports back via [`Scheduler::record_run_result`]. This keeps the
//! scheduler a pure matcher with no dependency on the execution engine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use nchat_types::{ScheduleId, WorkflowId};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::errors::CronError;
use crate::parser::CronExpression;

/// Outcome of the most recently fired run of a [`Schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleRunStatus {
    /// The workflow run this schedule triggered completed successfully.
    Succeeded,
    /// The workflow run this schedule triggered failed.
    Failed,
}

/// A workflow's recurring cron schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Unique identifier for this schedule.
    pub id: ScheduleId,
    /// The workflow this schedule triggers.
    pub workflow_id: WorkflowId,
    /// The 5-field cron expression driving this schedule.
    pub cron_expression: String,
    /// IANA timezone name the expression is described in. Matching is
    /// currently performed in UTC regardless of this field; see
    /// `DESIGN.md`.
    pub timezone: String,
    /// Whether this schedule currently fires on tick. Paused schedules,
    /// and schedules past their `end_date`, are inactive.
    pub active: bool,
    /// The next instant this schedule is due to fire.
    pub next_run_at: DateTime<Utc>,
    /// When this schedule last fired.
    pub last_run_at: Option<DateTime<Utc>>,
    /// The outcome of the run this schedule last fired, if reported.
    pub last_run_status: Option<ScheduleRunStatus>,
}

struct ScheduleEntry {
    schedule: Schedule,
    expression: CronExpression,
    end_date: Option<DateTime<Utc>>,
    last_fired_minute: Option<DateTime<Utc>>,
}

/// Registry of workflow cron schedules, matched on each [`Scheduler::tick`].
pub struct Scheduler {
    schedules: Mutex<HashMap<ScheduleId, ScheduleEntry>>,
    by_workflow: Mutex<HashMap<WorkflowId, ScheduleId>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            schedules: Mutex::new(HashMap::new()),
            by_workflow: Mutex::new(HashMap::new()),
        }
    }

    /// Create a schedule for `workflow_id`, or replace the existing one
    /// in place if this workflow already has a schedule. Rejects an
    /// unparseable `cron_expression`.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_schedule(
        &self,
        workflow_id: WorkflowId,
        cron_expression: &str,
        timezone: &str,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Schedule, CronError> {
        let expression = CronExpression::parse(cron_expression)?;
        let search_floor = start_date.map(|s| s.max(now)).unwrap_or(now);
        let next_run_at = expression.next_after(search_floor).unwrap_or(search_floor);

        let mut by_workflow = self.by_workflow.lock().await;
        let mut schedules = self.schedules.lock().await;

        let id = by_workflow
            .get(&workflow_id)
            .copied()
            .unwrap_or_else(ScheduleId::new);

        let schedule = Schedule {
            id,
            workflow_id,
            cron_expression: cron_expression.to_string(),
            timezone: timezone.to_string(),
            active: true,
            next_run_at,
            last_run_at: None,
            last_run_status: None,
        };

        schedules.insert(
            id,
            ScheduleEntry {
                schedule: schedule.clone(),
                expression,
                end_date,
                last_fired_minute: None,
            },
        );
        by_workflow.insert(workflow_id, id);

        info!(schedule_id = %id, workflow_id = %workflow_id, "created schedule");
        Ok(schedule)
    }

    /// Pause a schedule: it stops firing but is not removed.
    pub async fn pause(&self, id: ScheduleId) -> Result<(), CronError> {
        let mut schedules = self.schedules.lock().await;
        let entry = schedules.get_mut(&id).ok_or(CronError::UnknownSchedule)?;
        entry.schedule.active = false;
        Ok(())
    }

    /// Resume a paused schedule, recomputing its next fire time from `now`.
    pub async fn resume(&self, id: ScheduleId, now: DateTime<Utc>) -> Result<(), CronError> {
        let mut schedules = self.schedules.lock().await;
        let entry = schedules.get_mut(&id).ok_or(CronError::UnknownSchedule)?;
        entry.schedule.active = true;
        entry.schedule.next_run_at = entry.expression.next_after(now).unwrap_or(now);
        Ok(())
    }

    /// Permanently remove a schedule.
    pub async fn remove(&self, id: ScheduleId) -> Result<(), CronError> {
        let mut schedules = self.schedules.lock().await;
        let entry = schedules.remove(&id).ok_or(CronError::UnknownSchedule)?;
        self.by_workflow.lock().await.remove(&entry.schedule.workflow_id);
        Ok(())
    }

    /// Fetch a schedule's current state.
    pub async fn get(&self, id: ScheduleId) -> Result<Schedule, CronError> {
        self.schedules
            .lock()
            .await
            .get(&id)
            .map(|entry| entry.schedule.clone())
            .ok_or(CronError::UnknownSchedule)
    }

    /// Record the outcome of the run a schedule most recently fired.
    pub async fn record_run_result(&self, id: ScheduleId, status: ScheduleRunStatus) -> Result<(), CronError> {
        let mut schedules = self.schedules.lock().await;
        let entry = schedules.get_mut(&id).ok_or(CronError::UnknownSchedule)?;
        entry.schedule.last_run_status = Some(status);
        Ok(())
    }

    /// Return every schedule due to fire at `now`, marking each as fired
    /// for that minute so a second `tick` call within the same minute
    /// does not fire it again. Schedules past their `end_date` are
    /// auto-deactivated instead of fired.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<ScheduleId> {
        use chrono::{Datelike, Timelike};

        let minute_bucket = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);

        let mut fired = Vec::new();
        let mut schedules = self.schedules.lock().await;
        for (id, entry) in schedules.iter_mut() {
            if !entry.schedule.active {
                continue;
            }
            if let Some(end_date) = entry.end_date {
                if now >= end_date {
                    entry.schedule.active = false;
                    info!(schedule_id = %id, "schedule reached end_date, auto-deactivating");
                    continue;
                }
            }
            if entry.last_fired_minute == Some(minute_bucket) {
                continue;
            }
            let dow = now.weekday().num_days_from_sunday();
            if entry
                .expression
                .matches(now.minute(), now.hour(), now.day(), now.month(), dow)
            {
                entry.last_fired_minute = Some(minute_bucket);
                entry.schedule.last_run_at = Some(now);
                entry.schedule.next_run_at = entry.expression.next_after(now).unwrap_or(now);
                fired.push(*id);
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn fires_matching_schedule() {
        let scheduler = Scheduler::new();
        let workflow_id = WorkflowId::new();
        let schedule = scheduler
            .create_schedule(workflow_id, "0 9 * * *", "UTC", None, None, at("2026-01-01T00:00:00Z"))
            .await
            .unwrap();

        let fired = scheduler.tick(at("2026-01-01T09:00:00Z")).await;
        assert_eq!(fired, vec![schedule.id]);
    }

    #[tokio::test]
    async fn does_not_fire_twice_in_same_minute() {
        let scheduler = Scheduler::new();
        let workflow_id = WorkflowId::new();
        scheduler
            .create_schedule(workflow_id, "0 9 * * *", "UTC", None, None, at("2026-01-01T00:00:00Z"))
            .await
            .unwrap();

        scheduler.tick(at("2026-01-01T09:00:00Z")).await;
        let second = scheduler.tick(at("2026-01-01T09:00:30Z")).await;
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn creating_for_same_workflow_replaces_in_place() {
        let scheduler = Scheduler::new();
        let workflow_id = WorkflowId::new();
        let first = scheduler
            .create_schedule(workflow_id, "0 9 * * *", "UTC", None, None, at("2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        let second = scheduler
            .create_schedule(workflow_id, "0 10 * * *", "UTC", None, None, at("2026-01-01T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let fired_at_nine = scheduler.tick(at("2026-01-01T09:00:00Z")).await;
        assert!(fired_at_nine.is_empty());
        let fired_at_ten = scheduler.tick(at("2026-01-01T10:00:00Z")).await;
        assert_eq!(fired_at_ten, vec![second.id]);
    }

    #[tokio::test]
    async fn paused_schedule_does_not_fire() {
        let scheduler = Scheduler::new();
        let workflow_id = WorkflowId::new();
        let schedule = scheduler
            .create_schedule(workflow_id, "* * * * *", "UTC", None, None, at("2026-01-01T00:00:00Z"))
            .await
            .unwrap();

        scheduler.pause(schedule.id).await.unwrap();
        let fired = scheduler.tick(at("2026-01-01T00:01:00Z")).await;
        assert!(fired.is_empty());

        scheduler.resume(schedule.id, at("2026-01-01T00:01:00Z")).await.unwrap();
        let fired = scheduler.tick(at("2026-01-01T00:02:00Z")).await;
        assert_eq!(fired, vec![schedule.id]);
    }

    #[tokio::test]
    async fn removed_schedule_never_fires() {
        let scheduler = Scheduler::new();
        let workflow_id = WorkflowId::new();
        let schedule = scheduler
            .create_schedule(workflow_id, "* * * * *", "UTC", None, None, at("2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        scheduler.remove(schedule.id).await.unwrap();

        let fired = scheduler.tick(at("2026-01-01T00:01:00Z")).await;
        assert!(fired.is_empty());
        assert!(matches!(scheduler.get(schedule.id).await, Err(CronError::UnknownSchedule)));
    }

    #[tokio::test]
    async fn auto_deactivates_past_end_date() {
        let scheduler = Scheduler::new();
        let workflow_id = WorkflowId::new();
        let schedule = scheduler
            .create_schedule(
                workflow_id,
                "* * * * *",
                "UTC",
                None,
                Some(at("2026-01-01T00:02:00Z")),
                at("2026-01-01T00:00:00Z"),
            )
            .await
            .unwrap();

        let fired = scheduler.tick(at("2026-01-01T00:01:00Z")).await;
        assert_eq!(fired, vec![schedule.id]);

        let fired = scheduler.tick(at("2026-01-01T00:03:00Z")).await;
        assert!(fired.is_empty());
        let fetched = scheduler.get(schedule.id).await.unwrap();
        assert!(!fetched.active);
    }

    #[tokio::test]
    async fn invalid_cron_expression_is_rejected() {
        let scheduler = Scheduler::new();
        let result = scheduler
            .create_schedule(WorkflowId::new(), "not a cron", "UTC", None, None, at("2026-01-01T00:00:00Z"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn record_run_result_is_reflected_in_get() {
        let scheduler = Scheduler::new();
        let workflow_id = WorkflowId::new();
        let schedule = scheduler
            .create_schedule(workflow_id, "0 9 * * *", "UTC", None, None, at("2026-01-01T00:00:00Z"))
            .await
            .unwrap();

        scheduler.tick(at("2026-01-01T09:00:00Z")).await;
        scheduler
            .record_run_result(schedule.id, ScheduleRunStatus::Succeeded)
            .await
            .unwrap();

        let fetched = scheduler.get(schedule.id).await.unwrap();
        assert_eq!(fetched.last_run_status, Some(ScheduleRunStatus::Succeeded));
        assert_eq!(fetched.last_run_at, Some(at("2026-01-01T09:00:00Z")));
    }
}
