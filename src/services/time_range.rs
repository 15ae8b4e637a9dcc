//! Parsing of time range hints and incident timestamps.
//!
//! Accepted range hints:
//!
//! - relative lengths ending now: `15m`, `1h`, `24h`, `7d`, `2w`, with an
//!   optional `last` prefix and long unit names (`last 2 hours`, `last day`),
//! - explicit ranges: `<rfc3339>/<rfc3339>`.
//!
//! Windows longer than [`MAX_RANGE_DAYS`] are rejected.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::log_event::epoch_to_datetime;
use crate::domain::models::TimeWindow;

pub const MAX_RANGE_DAYS: i64 = 30;

/// Parse a relative duration such as `15m`, `2 hours`, or `day`.
pub fn parse_duration_hint(hint: &str) -> Option<Duration> {
    let hint = hint.trim().to_lowercase();
    let split = hint.find(|c: char| !c.is_ascii_digit()).unwrap_or(hint.len());
    let (digits, unit) = hint.split_at(split);
    let amount: i64 = if digits.is_empty() { 1 } else { digits.parse().ok()? };
    if amount <= 0 {
        return None;
    }

    let duration = match unit.trim() {
        "s" | "sec" | "secs" | "second" | "seconds" => Duration::try_seconds(amount)?,
        "m" | "min" | "mins" | "minute" | "minutes" => Duration::try_minutes(amount)?,
        "h" | "hr" | "hrs" | "hour" | "hours" => Duration::try_hours(amount)?,
        "d" | "day" | "days" => Duration::try_days(amount)?,
        "w" | "week" | "weeks" => Duration::try_weeks(amount)?,
        _ => return None,
    };
    Some(duration)
}

/// Resolve a range hint into a window ending at `now` (or the explicit range).
pub fn parse_time_range(hint: &str, now: DateTime<Utc>) -> DomainResult<TimeWindow> {
    let trimmed = hint.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidTimeRange(hint.to_string()));
    }

    let window = if let Some((start, end)) = trimmed.split_once('/') {
        let start = parse_rfc3339(start).ok_or_else(|| DomainError::InvalidTimeRange(hint.to_string()))?;
        let end = parse_rfc3339(end).ok_or_else(|| DomainError::InvalidTimeRange(hint.to_string()))?;
        if end <= start {
            return Err(DomainError::InvalidInput(format!(
                "time range end {end} is not after start {start}"
            )));
        }
        TimeWindow::new(start, end)
    } else {
        let lowered = trimmed.to_lowercase();
        let relative = lowered.strip_prefix("last").map_or(lowered.as_str(), str::trim);
        let length = parse_duration_hint(relative).ok_or_else(|| DomainError::InvalidTimeRange(hint.to_string()))?;
        if length > max_range() {
            return Err(oversized(trimmed));
        }
        TimeWindow::last(length, now)
    };

    if window.duration() > max_range() {
        return Err(oversized(trimmed));
    }
    Ok(window)
}

fn max_range() -> Duration {
    Duration::days(MAX_RANGE_DAYS)
}

fn oversized(hint: &str) -> DomainError {
    DomainError::InvalidInput(format!(
        "time range '{hint}' exceeds the maximum of {MAX_RANGE_DAYS} days"
    ))
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an incident instant: RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), or an
/// epoch value in seconds, milliseconds, or microseconds.
pub fn parse_incident_time(value: &str) -> DomainResult<DateTime<Utc>> {
    let trimmed = value.trim();
    let invalid = |reason: &str| DomainError::InvalidTimestamp {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("timestamp is empty"));
    }
    if let Some(dt) = parse_rfc3339(trimmed) {
        return Ok(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let raw: i64 = trimmed.parse().map_err(|_| invalid("epoch value out of range"))?;
        return epoch_to_datetime(raw).ok_or_else(|| invalid("epoch value out of range"));
    }
    Err(invalid("expected RFC 3339 or epoch seconds/milliseconds"))
}
