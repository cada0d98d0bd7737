//! Periodic health checking with consecutive-failure auto-disable.
//!
//! The monitor never calls a wall clock or spawns its own timer: a caller
//! (typically a `tokio::time::interval` loop in the binary crate) drives
//! it by calling [`HealthMonitor::tick`] with the current time. This keeps
//! expiry and auto-disable logic deterministic under test.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nchat_connector::Connector;
use nchat_telemetry::Metrics;
use nchat_types::{Clock, InstallationId};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::errors::HealthMonitorError;

/// Health status of a single integration installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// The most recent check succeeded, or no check has run yet.
    Healthy,
    /// At least one check has failed, but not enough to auto-disable.
    Degraded,
    /// Consecutive failures crossed the configured threshold; the
    /// installation has been auto-disabled.
    Disabled,
}

/// Monitor configuration.
#[derive(Debug, Clone)]
pub struct HealthMonitorConfig {
    /// Minimum time between checks for a given installation.
    pub check_interval: chrono::Duration,
    /// Consecutive failures before auto-disabling.
    pub failure_threshold: u32,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: chrono::Duration::minutes(5),
            failure_threshold: 3,
        }
    }
}

#[derive(Clone)]
struct MonitorState {
    connector: Arc<dyn Connector>,
    status: HealthStatus,
    consecutive_failures: u32,
    last_checked: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Tracks health state for every registered integration installation.
pub struct HealthMonitor {
    config: HealthMonitorConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    installations: Mutex<HashMap<InstallationId, MonitorState>>,
}

impl HealthMonitor {
    /// Create a monitor with no installations registered yet.
    pub fn new(config: HealthMonitorConfig, clock: Arc<dyn Clock>, metrics: Arc<Metrics>) -> Self {
        Self {
            config,
            clock,
            metrics,
            installations: Mutex::new(HashMap::new()),
        }
    }

    /// Start monitoring `installation_id` through `connector`.
    pub async fn register(&self, installation_id: InstallationId, connector: Arc<dyn Connector>) {
        self.installations.lock().await.insert(
            installation_id,
            MonitorState {
                connector,
                status: HealthStatus::Healthy,
                consecutive_failures: 0,
                last_checked: None,
                last_error: None,
            },
        );
    }

    /// Stop monitoring `installation_id`.
    pub async fn deregister(&self, installation_id: InstallationId) {
        self.installations.lock().await.remove(&installation_id);
    }

    /// Current status for `installation_id`.
    pub async fn status(
        &self,
        installation_id: InstallationId,
    ) -> Result<HealthStatus, HealthMonitorError> {
        self.installations
            .lock()
            .await
            .get(&installation_id)
            .map(|s| s.status)
            .ok_or(HealthMonitorError::UnknownInstallation(installation_id))
    }

    /// Run due health checks as of `now`, updating status and returning
    /// the IDs that were checked this tick.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<InstallationId> {
        let due: Vec<(InstallationId, Arc<dyn Connector>)> = {
            let installations = self.installations.lock().await;
            installations
                .iter()
                .filter(|(_, state)| {
                    state.status != HealthStatus::Disabled
                        && state
                            .last_checked
                            .map(|last| now - last >= self.config.check_interval)
                            .unwrap_or(true)
                })
                .map(|(id, state)| (*id, state.connector.clone()))
                .collect()
        };

        let mut checked = Vec::with_capacity(due.len());
        for (id, connector) in due {
            let result = connector.health_check().await;
            self.record_result(id, now, result).await;
            checked.push(id);
        }
        checked
    }

    async fn record_result(
        &self,
        installation_id: InstallationId,
        now: DateTime<Utc>,
        result: Result<(), nchat_connector::ConnectorError>,
    ) {
        let mut installations = self.installations.lock().await;
        let Some(state) = installations.get_mut(&installation_id) else {
            return;
        };

        state.last_checked = Some(now);
        let mut auto_disabled = false;

        match result {
            Ok(()) => {
                state.consecutive_failures = 0;
                state.last_error = None;
                if state.status != HealthStatus::Disabled {
                    state.status = HealthStatus::Healthy;
                }
            }
            Err(err) => {
                state.consecutive_failures += 1;
                state.last_error = Some(err.to_string());
                if state.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        installation_id = %installation_id,
                        failures = state.consecutive_failures,
                        "auto-disabling integration after repeated health check failures"
                    );
                    state.status = HealthStatus::Disabled;
                    auto_disabled = true;
                } else {
                    state.status = HealthStatus::Degraded;
                }
            }
        }

        if state.status == HealthStatus::Healthy {
            info!(installation_id = %installation_id, "health check passed");
        }
        self.metrics.record_health_check(auto_disabled);
    }

    /// Manually clear a disabled installation back to healthy, e.g. after
    /// an operator fixes the underlying credential.
    pub async fn reenable(&self, installation_id: InstallationId) -> Result<(), HealthMonitorError> {
        let mut installations = self.installations.lock().await;
        let state = installations
            .get_mut(&installation_id)
            .ok_or(HealthMonitorError::UnknownInstallation(installation_id))?;
        state.status = HealthStatus::Healthy;
        state.consecutive_failures = 0;
        state.last_error = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nchat_connector::mock::MockConnector;
    use nchat_connector::ConnectorError;
    use nchat_types::FixedClock;

    fn clock_at_epoch() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
        ))
    }

    #[tokio::test]
    async fn healthy_connector_stays_healthy() {
        let clock = clock_at_epoch();
        let monitor = HealthMonitor::new(
            HealthMonitorConfig::default(),
            clock.clone(),
            Arc::new(Metrics::new()),
        );
        let id = InstallationId::new();
        let connector = Arc::new(MockConnector::new("slack", vec![]));
        monitor.register(id, connector).await;

        monitor.tick(clock.now()).await;
        assert_eq!(monitor.status(id).await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn auto_disables_after_threshold_failures() {
        let clock = clock_at_epoch();
        let monitor = HealthMonitor::new(
            HealthMonitorConfig {
                check_interval: chrono::Duration::minutes(1),
                failure_threshold: 2,
            },
            clock.clone(),
            Arc::new(Metrics::new()),
        );
        let id = InstallationId::new();
        let connector = Arc::new(MockConnector::new("slack", vec![]));
        connector.set_healthy(false);
        monitor.register(id, connector).await;

        monitor.tick(clock.now()).await;
        assert_eq!(monitor.status(id).await.unwrap(), HealthStatus::Degraded);

        clock.advance(chrono::Duration::minutes(1));
        monitor.tick(clock.now()).await;
        assert_eq!(monitor.status(id).await.unwrap(), HealthStatus::Disabled);
    }

    #[tokio::test]
    async fn disabled_installation_is_not_rechecked() {
        let clock = clock_at_epoch();
        let monitor = HealthMonitor::new(
            HealthMonitorConfig {
                check_interval: chrono::Duration::seconds(0),
                failure_threshold: 1,
            },
            clock.clone(),
            Arc::new(Metrics::new()),
        );
        let id = InstallationId::new();
        let connector = Arc::new(MockConnector::new("slack", vec![]));
        connector.set_healthy(false);
        monitor.register(id, connector.clone()).await;

        monitor.tick(clock.now()).await;
        assert_eq!(monitor.status(id).await.unwrap(), HealthStatus::Disabled);

        clock.advance(chrono::Duration::minutes(5));
        let checked = monitor.tick(clock.now()).await;
        assert!(!checked.contains(&id));
        assert_eq!(connector.call_count(), 0); // health_check doesn't use call()
    }

    #[tokio::test]
    async fn reenable_clears_disabled_state() {
        let clock = clock_at_epoch();
        let monitor = HealthMonitor::new(
            HealthMonitorConfig {
                check_interval: chrono::Duration::seconds(0),
                failure_threshold: 1,
            },
            clock.clone(),
            Arc::new(Metrics::new()),
        );
        let id = InstallationId::new();
        let connector = Arc::new(MockConnector::new("slack", vec![]));
        connector.set_healthy(false);
        monitor.register(id, connector).await;
        monitor.tick(clock.now()).await;
        assert_eq!(monitor.status(id).await.unwrap(), HealthStatus::Disabled);

        monitor.reenable(id).await.unwrap();
        assert_eq!(monitor.status(id).await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn unregistered_installation_reports_unknown() {
        let monitor = HealthMonitor::new(
            HealthMonitorConfig::default(),
            clock_at_epoch(),
            Arc::new(Metrics::new()),
        );
        assert!(matches!(
            monitor.status(InstallationId::new()).await,
            Err(HealthMonitorError::UnknownInstallation(_))
        ));
    }
}
