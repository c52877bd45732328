// crates/core/src/clock.rs

use std::time::Instant;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Clock abstraction so temporal resolution and rate limiting stay testable.
/// Production code uses `SystemClock`; tests inject fixed instants.
pub trait Clock: Send + Sync {
    /// Timezone-aware "now" in the configured zone.
    fn now(&self) -> DateTime<Tz>;

    /// Monotonic instant for interval bookkeeping.
    fn instant(&self) -> Instant {
        Instant::now()
    }
}

pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

/// Fixed-instant clock for tests.
pub struct FixedClock {
    now: DateTime<Tz>,
    base: Instant,
}

impl FixedClock {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self {
            now,
            base: Instant::now(),
        }
    }

    pub fn at(tz: Tz, y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Self {
        let now = tz
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .unwrap_or_else(|| tz.with_ymd_and_hms(y, mo, d, 12, 0, 0).unwrap());
        Self::new(now)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        self.now
    }

    fn instant(&self) -> Instant {
        self.base
    }
}
