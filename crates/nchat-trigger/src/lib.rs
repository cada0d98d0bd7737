//! # nchat-trigger
//!
//! Condition evaluation, dot-path context resolution, and `{{path}}`
//! template interpolation used to decide whether and how a workflow
//! trigger fires.

#![warn(missing_docs)]

mod condition;
mod context;
mod template;
mod trigger;

pub use condition::{Condition, ConditionOperator};
pub use context::Context;
pub use template::interpolate;
pub use trigger::{TriggerDefinition, TriggerKind, TriggerSignal};
