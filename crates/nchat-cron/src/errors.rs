//! Error types for cron expression parsing.

use thiserror::Error;

/// A cron expression failed to parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CronError {
    /// The expression did not have exactly five whitespace-separated
    /// fields (minute, hour, day-of-month, month, day-of-week).
    #[error("expected 5 fields, got {0}")]
    WrongFieldCount(usize),

    /// One field failed to parse.
    #[error("invalid {field} field {value:?}: {reason}")]
    InvalidField {
        /// Field name (`minute`, `hour`, `day-of-month`, `month`, `day-of-week`).
        field: &'static str,
        /// The raw text that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No schedule is registered under the given ID.
    #[error("unknown schedule")]
    UnknownSchedule,
}
