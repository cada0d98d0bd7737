//! # nchat-health-monitor
//!
//! Periodic liveness checking for integration installations, with
//! consecutive-failure auto-disable. Driven by an injected [`nchat_types::Clock`]
//! rather than a background timer of its own, so behavior is
//! deterministic under test.

#![warn(missing_docs)]

mod errors;
mod monitor;

pub use errors::HealthMonitorError;
pub use monitor::{HealthMonitor, HealthMonitorConfig, HealthStatus};
