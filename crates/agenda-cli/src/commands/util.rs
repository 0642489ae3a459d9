//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::{Context, bail};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use regex::Regex;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)\s+(minute|hour|day)s?\s+ago|in\s+(\d+)\s+(minute|hour|day)s?)$")
        .unwrap()
});

/// Conservative bound for relative offsets (one year in minutes).
const MAX_RELATIVE_MINUTES: i64 = 365 * 24 * 60;

/// Parse a point in time as RFC 3339 or relative to `reference`.
///
/// Supports:
/// - RFC 3339: "2025-05-20T10:30:00Z"
/// - "now"
/// - Relative: "2 hours ago", "30 minutes ago", "in 1 day"
pub fn parse_datetime(s: &str, reference: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if s.eq_ignore_ascii_case("now") {
        return Ok(reference);
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        bail!(
            "Invalid time: {s}. Use RFC 3339 (e.g., 2025-05-20T10:30:00Z), 'now', '2 hours ago' or 'in 30 minutes'"
        );
    };

    let (amount, unit, sign) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
        (Some(n), Some(unit), _, _) => (n.as_str(), unit.as_str(), -1),
        (_, _, Some(n), Some(unit)) => (n.as_str(), unit.as_str(), 1),
        _ => bail!("Invalid time: {s}"),
    };
    let n: i64 = amount
        .parse()
        .context("failed to parse number in relative time")?;

    let minutes_per_unit = match unit {
        "minute" => 1,
        "hour" => 60,
        "day" => 60 * 24,
        unit => bail!("Unknown time unit: {unit}"),
    };
    if n > MAX_RELATIVE_MINUTES / minutes_per_unit {
        bail!("Relative time value too large: {n} {unit}");
    }

    Ok(reference + Duration::minutes(sign * n * minutes_per_unit))
}

/// Parse a calendar day in `YYYY-MM-DD` form.
pub fn parse_day(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid day: {s}. Use YYYY-MM-DD"))
}

/// Window covering one UTC day, inclusive on both ends.
pub fn day_bounds(day: NaiveDate) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("no midnight on {day}"))?;
    let start = Utc.from_utc_datetime(&midnight);
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    Ok((start, end))
}
