//! Token bucket rate limiting for outbound connector calls.
//!
//! ## Algorithm
//!
//! Tokens are added at a fixed rate up to a capacity; each call consumes
//! one token; calls are rejected when the bucket is empty. Time comes
//! from an injected [`Clock`] so tests can drive refills deterministically
//! instead of sleeping.

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use nchat_types::Clock;
use parking_lot::Mutex;

struct BucketState {
    tokens: f64,
    last_refill: chrono::DateTime<chrono::Utc>,
}

/// A token bucket rate limiter.
pub struct RateLimiter {
    capacity: f64,
    refill_per_second: f64,
    state: Mutex<BucketState>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter with `capacity` burst size and `refill_per_second`
    /// tokens added per second, starting full.
    pub fn new(capacity: u32, refill_per_second: u32, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            capacity: capacity as f64,
            refill_per_second: refill_per_second as f64,
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: now,
            }),
            clock,
        }
    }

    fn refill_locked(&self, state: &mut BucketState) {
        let now = self.clock.now();
        let elapsed = now - state.last_refill;
        if elapsed > ChronoDuration::zero() {
            let elapsed_secs = elapsed.num_milliseconds() as f64 / 1000.0;
            state.tokens = (state.tokens + elapsed_secs * self.refill_per_second).min(self.capacity);
            state.last_refill = now;
        }
    }

    /// Attempt to consume one token. Returns `true` if the call may
    /// proceed, `false` if the bucket is currently empty.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        self.refill_locked(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, after applying any pending refill.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill_locked(&mut state);
        state.tokens
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

    #[test]
    fn allows_calls_within_capacity() {
        let clock = clock_at_epoch();
        let limiter = RateLimiter::new(3, 1, clock);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn refills_over_injected_time() {
        let clock = clock_at_epoch();
        let limiter = RateLimiter::new(2, 10, clock.clone());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        clock.advance(chrono::Duration::milliseconds(200)); // 2 tokens at 10/s
        assert!(limiter.try_acquire());
    }

    #[test]
    fn never_exceeds_capacity() {
        let clock = clock_at_epoch();
        let limiter = RateLimiter::new(2, 100, clock.clone());
        clock.advance(chrono::Duration::seconds(10));
        assert_eq!(limiter.available(), 2.0);
    }
}
