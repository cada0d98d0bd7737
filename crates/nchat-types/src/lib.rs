//! # nchat-types — shared domain identifiers and error taxonomy
//!
//! Single source of truth for the ID newtypes, the injectable [`Clock`]
//! abstraction, and the validation error shape reused across the
//! workflow, trigger, and cron crates.

pub mod clock;
pub mod errors;
pub mod ids;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::ValidationError;
pub use ids::{ApprovalId, InstallationId, RunId, ScheduleId, StepId, TriggerId, WorkflowId};
