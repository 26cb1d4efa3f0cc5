//! Wall-clock source for store-assigned timestamps.
//!
//! Timestamps are microseconds since the Unix epoch (`*_us` columns).
//! Callers never supply record timestamps; the ledger asks its [`Clock`].

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub const MICROS_PER_SECOND: i64 = 1_000_000;
pub const MICROS_PER_HOUR: i64 = 3_600 * MICROS_PER_SECOND;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now_us(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_us(&self) -> i64 {
        Utc::now().timestamp_micros()
    }
}

/// A settable clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: AtomicI64,
}

impl ManualClock {
    #[must_use]
    pub const fn new(now_us: i64) -> Self {
        Self {
            now_us: AtomicI64::new(now_us),
        }
    }

    pub fn set(&self, now_us: i64) {
        self.now_us.store(now_us, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now_us
            .fetch_add(secs.saturating_mul(MICROS_PER_SECOND), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> i64 {
        self.now_us.load(Ordering::SeqCst)
    }
}

/// Render a microsecond timestamp as RFC 3339 (UTC). Out-of-range values
/// fall back to the raw integer.
#[must_use]
pub fn format_us(ts_us: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(ts_us)
        .map_or_else(|| ts_us.to_string(), |dt| dt.to_rfc3339())
}

/// Start of the UTC day containing `ts_us`.
#[must_use]
pub fn utc_day_start_us(ts_us: i64) -> i64 {
    let day_us = 24 * MICROS_PER_HOUR;
    ts_us.div_euclid(day_us) * day_us
}
