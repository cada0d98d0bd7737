//! # nchat-integration-registry
//!
//! Catalog of installable connector types plus CRUD over per-workspace
//! integration installations, wiring each one to the credential vault and
//! the health monitor.

#![warn(missing_docs)]

mod errors;
mod registry;

pub use errors::RegistryError;
pub use registry::{Installation, InstallationStatus, IntegrationRegistry};
