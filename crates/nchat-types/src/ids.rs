//! # Newtype identifiers
//!
//! Every distinct entity in the system gets its own ID type wrapping a
//! [`Uuid`], so that a `WorkflowId` and a `RunId` can never be swapped by
//! accident at a call site even though both are just bytes underneath.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! newtype_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

newtype_id!(InstallationId);
newtype_id!(WorkflowId);
newtype_id!(RunId);
newtype_id!(StepId);
newtype_id!(TriggerId);
newtype_id!(ApprovalId);
newtype_id!(ScheduleId);
