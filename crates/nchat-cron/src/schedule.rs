//! Computing the next fire time for a parsed cron expression.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::parser::CronExpression;

/// Scan bound: refuse to search more than four years ahead, so a
/// pathological expression (e.g. Feb 30th, which never occurs) fails
/// fast instead of looping forever.
const MAX_SEARCH: Duration = Duration::days(4 * 365);

impl CronExpression {
    /// The next minute-aligned instant strictly after `after` that this
    /// expression matches, or `None` if none is found within four years.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = truncate_to_minute(after) + Duration::minutes(1);
        let deadline = after + MAX_SEARCH;

        let mut candidate = start;
        while candidate <= deadline {
            let dow = candidate.weekday().num_days_from_sunday();
            if self.matches(
                candidate.minute(),
                candidate.hour(),
                candidate.day(),
                candidate.month(),
                dow,
            ) {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at - Duration::nanoseconds(at.timestamp_subsec_nanos() as i64) - Duration::seconds(at.second() as i64)
}
