//! Wall-clock helpers and trade-time unit normalization.
//!
//! Exchanges report trade times in their own native unit. [`TimeUnit`] is the
//! per-exchange entry of the normalization table; [`TimeUnit::to_epoch_secs`]
//! turns a native timestamp into the whole seconds the downstream expects.

use std::time::{SystemTime, UNIX_EPOCH};

/// Native resolution of an exchange's trade timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    /// Convert a native timestamp to whole seconds since the epoch (floor).
    #[inline]
    pub fn to_epoch_secs(self, ts: i64) -> i64 {
        match self {
            Self::Seconds => ts,
            Self::Milliseconds => ts.div_euclid(1_000),
        }
    }
}

/// Current time as **milliseconds** since Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or_default()
}
