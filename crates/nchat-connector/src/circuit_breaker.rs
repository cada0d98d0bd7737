//! Circuit breaker for a single connector's outbound calls.
//!
//! ```text
//!                    success
//!            ┌─────────────────────┐
//!            │                     │
//!            ▼                     │
//!      ┌──────────┐          ┌──────────┐          ┌──────────┐
//!      │  CLOSED  │ ───────► │   OPEN   │ ───────► │HALF-OPEN │
//!      │ (normal) │ failures │ (reject) │  timeout │  (probe) │
//!      └──────────┘          └──────────┘          └──────────┘
//!            ▲                                           │
//!            │                                           │
//!            └───────────────────────────────────────────┘
//!                           success
//! ```
//!
//! - `failure_threshold`: consecutive failures before opening
//! - `success_threshold`: consecutive successes in half-open before closing
//! - `open_timeout`: time before an open circuit allows a probe

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use nchat_types::Clock;
use parking_lot::Mutex;
use tracing::{debug, info};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation — calls pass through.
    Closed,
    /// Calls are rejected immediately.
    Open,
    /// A limited number of probe calls are allowed through.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Consecutive successes in half-open before the circuit closes.
    pub success_threshold: u32,
    /// How long the circuit stays open before allowing a probe.
    pub open_timeout: chrono::Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: ChronoDuration::seconds(30),
        }
    }
}

struct CircuitData {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Per-connector circuit breaker.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    data: Mutex<CircuitData>,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker, starting closed.
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            data: Mutex::new(CircuitData {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
            }),
            clock,
        }
    }

    /// Current state, after applying any timeout-driven transition.
    pub fn state(&self) -> CircuitState {
        let mut data = self.data.lock();
        self.maybe_transition_to_half_open(&mut data);
        data.state
    }

    fn maybe_transition_to_half_open(&self, data: &mut CircuitData) {
        if data.state == CircuitState::Open {
            if let Some(opened_at) = data.opened_at {
                if self.clock.now() - opened_at >= self.config.open_timeout {
                    debug!("circuit breaker transitioning to half-open");
                    data.state = CircuitState::HalfOpen;
                    data.consecutive_successes = 0;
                }
            }
        }
    }

    /// Whether a call should be allowed through right now.
    pub fn should_allow(&self) -> bool {
        let mut data = self.data.lock();
        self.maybe_transition_to_half_open(&mut data);
        !matches!(data.state, CircuitState::Open)
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut data = self.data.lock();
        match data.state {
            CircuitState::Closed => {
                data.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                data.consecutive_successes += 1;
                if data.consecutive_successes >= self.config.success_threshold {
                    info!("circuit breaker closing after successful probes");
                    data.state = CircuitState::Closed;
                    data.consecutive_failures = 0;
                    data.consecutive_successes = 0;
                    data.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut data = self.data.lock();
        match data.state {
            CircuitState::Closed => {
                data.consecutive_failures += 1;
                if data.consecutive_failures >= self.config.failure_threshold {
                    info!("circuit breaker opening after repeated failures");
                    data.state = CircuitState::Open;
                    data.opened_at = Some(self.clock.now());
                }
            }
            CircuitState::HalfOpen => {
                info!("probe failed, circuit breaker re-opening");
                data.state = CircuitState::Open;
                data.opened_at = Some(self.clock.now());
                data.consecutive_successes = 0;
            }
            CircuitState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nchat_types::FixedClock;

    fn clock_at_epoch() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        ))
    }

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 2,
            open_timeout: ChronoDuration::seconds(10),
        }
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(config(), clock_at_epoch());
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.should_allow());
    }

    #[test]
    fn half_opens_after_timeout() {
        let clock = clock_at_epoch();
        let breaker = CircuitBreaker::new(config(), clock.clone());
        for _ in 0..3 {
            breaker.record_failure();
        }
        clock.advance(ChronoDuration::seconds(11));
        assert!(breaker.should_allow());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn closes_after_success_threshold_in_half_open() {
        let clock = clock_at_epoch();
        let breaker = CircuitBreaker::new(config(), clock.clone());
        for _ in 0..3 {
            breaker.record_failure();
        }
        clock.advance(ChronoDuration::seconds(11));
        breaker.should_allow(); // drives the half-open transition
        breaker.record_success();
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let clock = clock_at_epoch();
        let breaker = CircuitBreaker::new(config(), clock.clone());
        for _ in 0..3 {
            breaker.record_failure();
        }
        clock.advance(ChronoDuration::seconds(11));
        breaker.should_allow();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn success_in_closed_resets_failure_count() {
        let breaker = CircuitBreaker::new(config(), clock_at_epoch());
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        // Only 2 consecutive failures since the reset, threshold is 3.
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
