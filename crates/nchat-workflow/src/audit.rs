//! Append-only audit trail for run and step lifecycle events.
//!
//! An in-process replacement for the kind of cross-service event bus a
//! larger deployment would use: every state transition the engine makes
//! is appended here first, so a run's history can always be reconstructed
//! even if nothing downstream ever consumes it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use nchat_types::{RunId, StepId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A single recorded event in a run's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// The run this event belongs to.
    pub run_id: RunId,
    /// The step this event concerns, if any (run-level events have none).
    pub step_id: Option<StepId>,
    /// What happened, e.g. `"run_started"`, `"step_succeeded"`.
    pub kind: String,
    /// Free-form human-readable detail.
    pub detail: String,
}

/// Thread-safe, append-only store of [`AuditEntry`] records for all runs.
#[derive(Debug, Default, Clone)]
pub struct AuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl AuditLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: AuditEntry) {
        self.entries.lock().push(entry);
    }

    /// All entries for a given run, in the order they were recorded.
    pub fn for_run(&self, run_id: RunId) -> Vec<AuditEntry> {
        self.entries.lock().iter().filter(|e| e.run_id == run_id).cloned().collect()
    }

    /// Total number of entries recorded across all runs.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the log has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
