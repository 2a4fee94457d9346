//! Candidate booking dates and per-day time slots.
//!
//! All functions take the reference "now" as a parameter and are pure: the
//! same `(config, now)` or `(config, date)` always produces the same answer.
//! Nothing here knows which slots are already booked; callers check
//! candidates against their own bookings.
//!
//! # Lead time
//!
//! A candidate date is dropped when its local start-of-day (in the config's
//! timezone) is less than `buffer_hours` after `now`. With a 24 hour buffer
//! at 10:00 on a Monday, Tuesday (14 hours away) is dropped and Wednesday
//! is the first candidate.
//!
//! # Closed days
//!
//! [`time_slots`] on a weekday without hours returns
//! [`EngineError::NoAvailability`]. Callers that want the product's stock
//! schedule can fall back to [`default_time_slots`].

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, trace};

use crate::availability::AvailabilityConfig;
use crate::error::EngineError;
use crate::time::{local_date, local_instant, start_of_day};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Dates in `(today, today + window_days]` that are open and respect the
/// lead-time buffer, in ascending order.
///
/// The scan always stops after `window_days` calendar days, so a restrictive
/// config may yield few or no dates; an empty result is not an error.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] if the config has no open weekday
/// or an unusable slot granularity.
pub fn candidate_dates(
    config: &AvailabilityConfig,
    now: DateTime<Utc>,
    window_days: u32,
) -> Result<Vec<NaiveDate>, EngineError> {
    config.check()?;
    let tz = config.timezone;
    let today = local_date(now, tz);
    let Some(earliest) = lead_time_end(config, now) else {
        debug!(
            owner = %config.owner_id,
            buffer_hours = config.buffer_hours,
            "lead time ends past the calendar"
        );
        return Ok(Vec::new());
    };

    let mut dates = Vec::new();
    for offset in 1..=u64::from(window_days) {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        if !config.is_open(date.weekday()) {
            continue;
        }
        match start_of_day(date, tz) {
            Some(start) if start.with_timezone(&Utc) >= earliest => dates.push(date),
            _ => trace!(%date, buffer_hours = config.buffer_hours, "date inside lead time"),
        }
    }
    debug!(
        owner = %config.owner_id,
        %today,
        window_days,
        found = dates.len(),
        "computed candidate dates"
    );
    Ok(dates)
}

/// Time-of-day slots for `date`: from the weekday's opening time
/// (inclusive) in `slot_granularity_minutes` steps, strictly before closing.
///
/// # Errors
///
/// [`EngineError::Configuration`] if the config is unusable, or
/// [`EngineError::NoAvailability`] if `date` falls on a closed weekday.
pub fn time_slots(
    config: &AvailabilityConfig,
    date: NaiveDate,
) -> Result<Vec<NaiveTime>, EngineError> {
    config.check()?;
    let weekday = date.weekday();
    let hours = config
        .hours_for(weekday)
        .ok_or(EngineError::NoAvailability { date, weekday })?;
    Ok(step_times(
        hours.open(),
        hours.close(),
        i64::from(config.slot_granularity_minutes),
    ))
}

/// The stock schedule: 09:00 to 16:00 in 30 minute steps, without the
/// 12:00–13:00 lunch hour.
pub fn default_time_slots() -> Vec<NaiveTime> {
    let (Some(open), Some(close), Some(lunch), Some(after_lunch)) = (
        NaiveTime::from_hms_opt(9, 0, 0),
        NaiveTime::from_hms_opt(16, 0, 0),
        NaiveTime::from_hms_opt(12, 0, 0),
        NaiveTime::from_hms_opt(13, 0, 0),
    ) else {
        return Vec::new();
    };
    step_times(open, close, 30)
        .into_iter()
        .filter(|t| *t < lunch || *t >= after_lunch)
        .collect()
}

/// One candidate date with the slots still bookable on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookableDay {
    pub date: NaiveDate,
    pub slots: Vec<NaiveTime>,
}

/// Candidate dates over the config's lookahead, each with its time slots.
///
/// Slots starting before `now + buffer_hours`, or at a wall-clock time that
/// does not exist on that date (DST gap), are dropped, as are days left
/// with no slots.
pub fn bookable_days(
    config: &AvailabilityConfig,
    now: DateTime<Utc>,
) -> Result<Vec<BookableDay>, EngineError> {
    let candidates = candidate_dates(config, now, config.look_ahead_days)?;
    let Some(earliest) = lead_time_end(config, now) else {
        return Ok(Vec::new());
    };
    let mut days = Vec::new();
    for date in candidates {
        let slots: Vec<NaiveTime> = time_slots(config, date)?
            .into_iter()
            .filter(|t| {
                local_instant(date, *t, config.timezone)
                    .is_some_and(|instant| instant.with_timezone(&Utc) >= earliest)
            })
            .collect();
        if !slots.is_empty() {
            days.push(BookableDay { date, slots });
        }
    }
    Ok(days)
}

/// `now + buffer_hours`, or `None` if that lies past the end of the calendar.
fn lead_time_end(config: &AvailabilityConfig, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    TimeDelta::try_hours(i64::from(config.buffer_hours))
        .and_then(|buffer| now.checked_add_signed(buffer))
}

fn step_times(open: NaiveTime, close: NaiveTime, step_minutes: i64) -> Vec<NaiveTime> {
    let step = TimeDelta::minutes(step_minutes);
    let mut slots = Vec::new();
    let mut current = open;
    while current < close {
        slots.push(current);
        let (next, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 {
            break;
        }
        current = next;
    }
    slots
}

// ── Tests ───────────────────────────────────────────────────────────────────
