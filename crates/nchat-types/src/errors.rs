//! # Shared validation error
//!
//! A single error type for "this user-supplied definition is malformed",
//! reused by the workflow validator and the trigger condition parser so
//! that both report problems the same shape back to callers.

use thiserror::Error;

/// A structural or semantic problem found while validating a definition
/// supplied by a caller (a workflow, a trigger condition, a schedule).
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// A required field was missing or empty.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A field held a value outside its allowed domain.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A reference to another entity (step, trigger, action) did not resolve.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// A dependency graph contained a cycle.
    #[error("cycle detected among: {0:?}")]
    CycleDetected(Vec<String>),

    /// A duplicate identifier was declared twice.
    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(String),
}
