//! Trailing time window ("last N days").

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A trailing window `[start, end]`, both bounds inclusive.
///
/// `end` is the evaluation instant. Records stamped after `end` (clock skew,
/// pre-dated entries) are still considered current; only `start` filters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window covering the `days` days before `now`.
    ///
    /// Saturates at the earliest representable instant.
    pub fn trailing_days(now: DateTime<Utc>, days: u32) -> Self {
        let start = now
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end: now }
    }

    /// `true` when `at` is not earlier than `start`.
    pub fn includes(&self, at: DateTime<Utc>) -> bool {
        at >= self.start
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}
