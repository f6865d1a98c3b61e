//! Wall-clock source for cache timestamps
//!
//! The store never calls `Local::now()` directly so tests can pin and advance time.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Timelike};

/// Source of the current local time used for freshness checks and record timestamps
pub trait Clock: fmt::Debug + Send + Sync {
    /// Returns the current local time without a timezone offset
    fn now(&self) -> NaiveDateTime;
}

/// Clock backed by the system's local wall clock
///
/// No skew handling: if the system clock moves backward, entries can appear fresh
/// for up to one ttl longer than intended.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    /// Local time truncated to microseconds, so records carry at most six fractional digits
    fn now(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(now.nanosecond() / 1_000 * 1_000)
            .unwrap_or(now)
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Sets the clock to an absolute time
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
    }

    /// Moves the clock forward, saturating at `NaiveDateTime::MAX`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = chrono::Duration::from_std(by)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(NaiveDateTime::MAX);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
