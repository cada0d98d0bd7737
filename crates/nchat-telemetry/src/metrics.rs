//! In-process metrics counters for workflow and integration activity.
//!
//! This crate does not ship a network exporter — wiring `Metrics` up to
//! Prometheus or another backend is the embedding application's job. The
//! [`MetricsRecorder`] trait is the seam: implement it against whatever
//! backend the deployment uses.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for workflow and integration activity.
#[derive(Default)]
pub struct Metrics {
    /// Workflow runs started.
    pub runs_started: AtomicU64,
    /// Workflow runs that completed successfully.
    pub runs_succeeded: AtomicU64,
    /// Workflow runs that failed.
    pub runs_failed: AtomicU64,
    /// Individual step executions attempted (including retries).
    pub steps_executed: AtomicU64,
    /// Step executions that were retried at least once.
    pub steps_retried: AtomicU64,
    /// Triggers evaluated.
    pub triggers_evaluated: AtomicU64,
    /// Triggers that fired (condition matched).
    pub triggers_fired: AtomicU64,
    /// Health checks performed against integrations.
    pub health_checks_performed: AtomicU64,
    /// Integrations auto-disabled after consecutive health-check failures.
    pub integrations_auto_disabled: AtomicU64,
}

impl Metrics {
    /// Create a fresh, zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a workflow run.
    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run outcome.
    pub fn record_run_finished(&self, succeeded: bool) {
        if succeeded {
            self.runs_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.runs_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a step execution attempt.
    pub fn record_step_executed(&self, was_retry: bool) {
        self.steps_executed.fetch_add(1, Ordering::Relaxed);
        if was_retry {
            self.steps_retried.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a trigger evaluation.
    pub fn record_trigger_evaluated(&self, fired: bool) {
        self.triggers_evaluated.fetch_add(1, Ordering::Relaxed);
        if fired {
            self.triggers_fired.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a health check, and whether it caused auto-disable.
    pub fn record_health_check(&self, auto_disabled: bool) {
        self.health_checks_performed.fetch_add(1, Ordering::Relaxed);
        if auto_disabled {
            self.integrations_auto_disabled
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a point-in-time snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_succeeded: self.runs_succeeded.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            steps_executed: self.steps_executed.load(Ordering::Relaxed),
            steps_retried: self.steps_retried.load(Ordering::Relaxed),
            triggers_evaluated: self.triggers_evaluated.load(Ordering::Relaxed),
            triggers_fired: self.triggers_fired.load(Ordering::Relaxed),
            health_checks_performed: self.health_checks_performed.load(Ordering::Relaxed),
            integrations_auto_disabled: self.integrations_auto_disabled.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`Metrics`]' counters.
#[derive(Clone, Debug, Default)]
pub struct MetricsSnapshot {
    pub runs_started: u64,
    pub runs_succeeded: u64,
    pub runs_failed: u64,
    pub steps_executed: u64,
    pub steps_retried: u64,
    pub triggers_evaluated: u64,
    pub triggers_fired: u64,
    pub health_checks_performed: u64,
    pub integrations_auto_disabled: u64,
}

/// Seam for forwarding counters to an external metrics backend.
pub trait MetricsRecorder: Send + Sync {
    /// Record the start of a workflow run.
    fn record_run_started(&self);
    /// Record a run outcome.
    fn record_run_finished(&self, succeeded: bool);
    /// Record a step execution attempt.
    fn record_step_executed(&self, was_retry: bool);
    /// Record a trigger evaluation.
    fn record_trigger_evaluated(&self, fired: bool);
    /// Record a health check, and whether it caused auto-disable.
    fn record_health_check(&self, auto_disabled: bool);
}

impl MetricsRecorder for Metrics {
    fn record_run_started(&self) {
        Metrics::record_run_started(self)
    }
    fn record_run_finished(&self, succeeded: bool) {
        Metrics::record_run_finished(self, succeeded)
    }
    fn record_step_executed(&self, was_retry: bool) {
        Metrics::record_step_executed(self, was_retry)
    }
    fn record_trigger_evaluated(&self, fired: bool) {
        Metrics::record_trigger_evaluated(self, fired)
    }
    fn record_health_check(&self, auto_disabled: bool) {
        Metrics::record_health_check(self, auto_disabled)
    }
}

/// Discards every recorded metric. Used when metrics are disabled.
#[derive(Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_run_started(&self) {}
    fn record_run_finished(&self, _succeeded: bool) {}
    fn record_step_executed(&self, _was_retry: bool) {}
    fn record_trigger_evaluated(&self, _fired: bool) {}
    fn record_health_check(&self, _auto_disabled: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = Metrics::new();
        let snap = metrics.snapshot();
        assert_eq!(snap.runs_started, 0);
    }

    #[test]
    fn records_run_lifecycle() {
        let metrics = Metrics::new();
        metrics.record_run_started();
        metrics.record_run_finished(true);
        metrics.record_run_finished(false);

        let snap = metrics.snapshot();
        assert_eq!(snap.runs_started, 1);
        assert_eq!(snap.runs_succeeded, 1);
        assert_eq!(snap.runs_failed, 1);
    }

    #[test]
    fn noop_metrics_never_panics() {
        let metrics = NoOpMetrics;
        metrics.record_run_started();
        metrics.record_run_finished(true);
        metrics.record_step_executed(true);
        metrics.record_trigger_evaluated(false);
        metrics.record_health_check(true);
    }
}
