//! Wall-clock sources and strictly monotonic history stamps.
//!
//! History entries are stamped in microseconds since the Unix epoch. Two
//! snapshots taken inside one clock tick (or across a backwards clock step)
//! would tie, so [`next_timestamp`] bumps the stamp one microsecond past the
//! previous entry. The bump acts as the tie-break counter of a hybrid clock:
//! ordering stays strict while stamps stay close to wall time.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};

pub const MICROS_PER_SEC: i64 = 1_000_000;
pub const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SEC;
pub const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;
pub const MICROS_PER_DAY: i64 = 24 * MICROS_PER_HOUR;

/// Source of the current wall-clock time.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Current time in microseconds since the Unix epoch.
    fn now_us(&self) -> i64;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_us(&self) -> i64 {
        Utc::now().timestamp_micros()
    }
}

/// A hand-driven clock for tests and deterministic replays.
///
/// Clones share the same underlying instant, so a test can keep one handle
/// and hand another to a [`crate::document::Document`].
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start_us: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_us)),
        }
    }

    pub fn set(&self, now_us: i64) {
        self.now.store(now_us, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_us: i64) {
        self.now.fetch_add(delta_us, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(secs * MICROS_PER_SEC);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Stamp for a new entry that strictly follows `previous_us`.
#[must_use]
pub fn next_timestamp(now_us: i64, previous_us: Option<i64>) -> i64 {
    match previous_us {
        Some(prev) if now_us <= prev => prev.saturating_add(1),
        _ => now_us,
    }
}

/// Convert a microsecond stamp to a UTC datetime for display.
#[must_use]
pub fn to_datetime(timestamp_us: i64) -> Option<DateTime<Utc>> {
    let secs = timestamp_us.div_euclid(MICROS_PER_SEC);
    let micros = timestamp_us.rem_euclid(MICROS_PER_SEC);
    let nanos = u32::try_from(micros * 1_000).ok()?;
    Utc.timestamp_opt(secs, nanos).single()
}
