// crates/routes/src/rate_limit.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pipa_core::Clock;
use tracing::debug;

/// Minimum-interval limiter for the shared outbound search backend. The only
/// cross-request mutable state in the system: one slot timestamp behind a
/// mutex, safe under concurrent in-flight requests.
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
            clock,
        }
    }

    /// Waits until this caller's reserved slot arrives. Slots are handed out
    /// under the lock, so concurrent callers serialize correctly even though
    /// the sleep happens outside it.
    pub async fn acquire(&self) {
        let wait = self.reserve();
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "Rate limiter delaying outbound call");
            tokio::time::sleep(wait).await;
        }
    }

    /// Reserves the next slot and returns how long the caller must wait for
    /// it. Split out from `acquire` so the arithmetic is testable without
    /// sleeping.
    fn reserve(&self) -> Duration {
        if self.min_interval.is_zero() {
            return Duration::ZERO;
        }

        let now = self.clock.instant();
        let mut slot = self.next_slot.lock();
        let start = match *slot {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *slot = Some(start + self.min_interval);
        start - now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use chrono_tz::Tz;

    struct StoppedClock {
        now: DateTime<Tz>,
        base: Instant,
    }

    impl Clock for StoppedClock {
        fn now(&self) -> DateTime<Tz> {
            self.now
        }

        fn instant(&self) -> Instant {
            self.base
        }
    }

    fn stopped_clock() -> Arc<StoppedClock> {
        Arc::new(StoppedClock {
            now: Utc::now().with_timezone(&chrono_tz::UTC),
            base: Instant::now(),
        })
    }

    #[test]
    fn first_caller_passes_immediately() {
        let limiter = RateLimiter::new(Duration::from_millis(500), stopped_clock());
        assert_eq!(limiter.reserve(), Duration::ZERO);
    }

    #[test]
    fn subsequent_callers_queue_behind_the_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(500), stopped_clock());
        assert_eq!(limiter.reserve(), Duration::ZERO);
        assert_eq!(limiter.reserve(), Duration::from_millis(500));
        assert_eq!(limiter.reserve(), Duration::from_millis(1000));
    }

    #[test]
    fn zero_interval_never_waits() {
        let limiter = RateLimiter::new(Duration::ZERO, stopped_clock());
        assert_eq!(limiter.reserve(), Duration::ZERO);
        assert_eq!(limiter.reserve(), Duration::ZERO);
    }
}
