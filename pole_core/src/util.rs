//! Small numeric and time helpers shared by the simulation stages.

use chrono::{DateTime, TimeDelta, Utc};

/// Number of milliseconds in one minute.
pub const MILLIS_PER_MIN: f64 = 60_000.0;
/// Number of seconds in one minute.
pub const SECS_PER_MIN: f64 = 60.0;

/// Offset `at` by a fractional number of minutes.
///
/// Returns `None` for non-finite input or when the result leaves chrono's range.
pub fn add_minutes(at: DateTime<Utc>, minutes: f64) -> Option<DateTime<Utc>> {
    if !minutes.is_finite() {
        return None;
    }
    let ms = (minutes * MILLIS_PER_MIN).round();
    if ms.abs() >= i64::MAX as f64 {
        return None;
    }
    let delta = TimeDelta::try_milliseconds(ms as i64)?;
    at.checked_add_signed(delta)
}

/// Parse operator-entered text as a strictly positive, finite number.
pub fn parse_positive(raw: Option<&str>) -> Option<f64> {
    let v = raw?.trim().parse::<f64>().ok()?;
    (v.is_finite() && v > 0.0).then_some(v)
}

/// Parse operator-entered minutes, truncating fractions; zero after truncation is rejected.
pub fn parse_whole_minutes(raw: Option<&str>) -> Option<u32> {
    let v = parse_positive(raw)?.trunc();
    if v < 1.0 || v > f64::from(u32::MAX) {
        return None;
    }
    Some(v as u32)
}
