//! Common time/period helpers for shooter_core.

use std::time::Duration;

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Compute the period in microseconds for a given control rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    debug_assert!(hz > 0, "rate_hz must be > 0");
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Nominal tick period as a `Duration`.
#[inline]
pub fn period(hz: u32) -> Duration {
    Duration::from_micros(period_us(hz))
}

/// Nominal tick period in seconds.
#[inline]
pub fn period_s(hz: u32) -> f64 {
    1.0 / f64::from(hz.max(1))
}
