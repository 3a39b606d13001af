use crate::error::{ProcessingError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Format of `local_date_time_full[80]` in the BOM observation feed
pub const COMPACT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| ProcessingError::UnknownTimezone(name.to_string()))
}

/// Parse `20251025093000` into a naive local timestamp.
///
/// Older partitions stored the key as a float, so a trailing `.0` is tolerated.
pub fn parse_compact_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(trimmed, COMPACT_TIMESTAMP_FORMAT).ok()
}

/// Local date of an RFC 3339 timestamp, keeping its own offset.
///
/// `2025-10-25T17:00:00+11:00` is the 25th regardless of the machine's zone.
pub fn local_date_of_rfc3339(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.date_naive())
}

/// Current wall-clock time in the given zone.
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// Seconds since the epoch to a UTC timestamp.
pub fn from_unix_seconds(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid unix timestamp: {}", secs)))
}

/// Convert a 12-hour clock reading (`hh:mm am`) to the hour of day.
pub fn hour_of_day(time: &str) -> Option<u32> {
    let time = time.trim().to_lowercase();
    let is_pm = time.ends_with("pm");
    let is_am = time.ends_with("am");
    if !is_pm && !is_am {
        return None;
    }

    let hour = time.split(':').next()?.trim().parse::<u32>().ok()?;
    if hour == 0 || hour > 12 {
        return None;
    }

    Some(match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    })
}
