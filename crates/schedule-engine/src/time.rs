//! Clock-free date and time helpers.
//!
//! Nothing in this crate reads the system clock. Callers pass the "now"
//! instant and the IANA timezone explicitly; these helpers translate them
//! into the local calendar dates the engine works with.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::EngineError;

/// Parse an IANA timezone string into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz, EngineError> {
    s.trim()
        .parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimezone(format!("'{}'", s)))
}

/// Parse a 24-hour `HH:MM` time of day (e.g., `"09:00"`, `"17:30"`).
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, EngineError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| EngineError::InvalidTime(format!("'{}': {}", s, e)))
}

/// Format a time of day as `HH:MM`.
pub fn format_time_of_day(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// The calendar date of `now` as seen in `tz`.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// The first instant of `date` in `tz`.
///
/// Where midnight falls inside a DST gap (e.g., `America/Santiago`), the
/// first wall-clock hour that exists is used instead.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> Option<DateTime<Tz>> {
    (0..=3).find_map(|hour| {
        let naive = date.and_hms_opt(hour, 0, 0)?;
        tz.from_local_datetime(&naive).earliest()
    })
}

/// Resolve a local wall-clock time on `date` to an instant in `tz`.
///
/// Ambiguous times (DST fold) resolve to the earlier instant; nonexistent
/// times (DST gap) return `None`.
pub fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(time)).earliest()
}

/// Parse a weekday name (`"monday"`, `"mon"`, case-insensitive).
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
