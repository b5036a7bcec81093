//! Time utilities: timezone-aware deadlines and local hours.

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Parse a deadline given either as RFC 3339 or as a local
/// "YYYY-MM-DD HH:MM" in `tz`, returning UTC.
pub fn parse_deadline(input: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    let ndt = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M"))
        .map_err(|e| anyhow::anyhow!("invalid deadline '{input}': {e}"))?;

    let local = tz
        .from_local_datetime(&ndt)
        .single()
        .ok_or_else(|| anyhow::anyhow!("ambiguous or invalid local time (DST?): {input} {tz}"))?;

    Ok(local.with_timezone(&Utc))
}

/// Hour-of-day (0-23) of `at` in `tz`.
pub fn local_hour(at: DateTime<Utc>, tz: Tz) -> u32 {
    at.with_timezone(&tz).hour()
}
