//! Booking availability configuration.
//!
//! [`AvailabilitySettings`] is the raw payload an owner saves (weekday
//! allow-list, per-weekday `HH:MM` hours, buffer). [`AvailabilityConfig`]
//! is the validated form the slot generator works on; build it with
//! [`AvailabilityConfig::from_settings`] or the builder methods.

use std::collections::BTreeMap;

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::EngineError;
use crate::rule::{day_index, weekday_from_index};
use crate::time::{format_time_of_day, parse_time_of_day, parse_timezone, parse_weekday};

pub const DEFAULT_SLOT_GRANULARITY_MINUTES: u32 = 30;
pub const DEFAULT_LOOK_AHEAD_DAYS: u32 = 30;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Opening hours for one weekday. `open` is bookable, `close` is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DayHoursFields")]
pub struct DayHours {
    open: NaiveTime,
    close: NaiveTime,
}

#[derive(Deserialize)]
struct DayHoursFields {
    open: NaiveTime,
    close: NaiveTime,
}

impl TryFrom<DayHoursFields> for DayHours {
    type Error = EngineError;

    fn try_from(fields: DayHoursFields) -> Result<Self, Self::Error> {
        DayHours::new(fields.open, fields.close)
    }
}

impl DayHours {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Result<Self, EngineError> {
        if open >= close {
            return Err(EngineError::Configuration(format!(
                "opening time {} must be before closing time {}",
                format_time_of_day(open),
                format_time_of_day(close)
            )));
        }
        Ok(DayHours { open, close })
    }

    /// Parse `HH:MM` open and close times.
    pub fn parse(open: &str, close: &str) -> Result<Self, EngineError> {
        DayHours::new(parse_time_of_day(open)?, parse_time_of_day(close)?)
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    pub fn close(&self) -> NaiveTime {
        self.close
    }
}

/// Validated per-owner availability.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityConfig {
    pub owner_id: String,
    hours: [Option<DayHours>; 7],
    /// Minimum lead time between "now" and a bookable day.
    pub buffer_hours: u32,
    pub slot_granularity_minutes: u32,
    pub look_ahead_days: u32,
    /// Timezone the hours are expressed in.
    pub timezone: Tz,
}

impl AvailabilityConfig {
    /// A config with every weekday closed and default granularity and lookahead.
    pub fn new(owner_id: impl Into<String>) -> Self {
        AvailabilityConfig {
            owner_id: owner_id.into(),
            hours: [None; 7],
            buffer_hours: 0,
            slot_granularity_minutes: DEFAULT_SLOT_GRANULARITY_MINUTES,
            look_ahead_days: DEFAULT_LOOK_AHEAD_DAYS,
            timezone: Tz::UTC,
        }
    }

    pub fn with_hours(mut self, weekday: Weekday, hours: DayHours) -> Self {
        self.set_hours(weekday, Some(hours));
        self
    }

    pub fn with_buffer_hours(mut self, buffer_hours: u32) -> Self {
        self.buffer_hours = buffer_hours;
        self
    }

    pub fn with_slot_granularity(mut self, minutes: u32) -> Self {
        self.slot_granularity_minutes = minutes;
        self
    }

    pub fn with_look_ahead_days(mut self, days: u32) -> Self {
        self.look_ahead_days = days;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Set or clear (`None` = closed) the hours for one weekday.
    pub fn set_hours(&mut self, weekday: Weekday, hours: Option<DayHours>) {
        self.hours[day_index(weekday) as usize] = hours;
    }

    pub fn hours_for(&self, weekday: Weekday) -> Option<DayHours> {
        self.hours[day_index(weekday) as usize]
    }

    pub fn is_open(&self, weekday: Weekday) -> bool {
        self.hours_for(weekday).is_some()
    }

    /// Open weekdays, Sunday first.
    pub fn open_days(&self) -> Vec<Weekday> {
        (0..7u8)
            .filter_map(weekday_from_index)
            .filter(|d| self.is_open(*d))
            .collect()
    }

    /// Check the config is usable for slot generation.
    ///
    /// # Errors
    ///
    /// [`EngineError::Configuration`] when no weekday has hours or the slot
    /// granularity is outside `1..=1440` minutes.
    pub fn check(&self) -> Result<(), EngineError> {
        if self.hours.iter().all(Option::is_none) {
            return Err(EngineError::Configuration(format!(
                "no weekday hours configured for owner '{}'",
                self.owner_id
            )));
        }
        if self.slot_granularity_minutes == 0 || self.slot_granularity_minutes > MINUTES_PER_DAY {
            return Err(EngineError::Configuration(format!(
                "slot granularity must be between 1 and {} minutes, got {}",
                MINUTES_PER_DAY, self.slot_granularity_minutes
            )));
        }
        Ok(())
    }

    /// Validate and normalize a raw settings payload.
    ///
    /// Every weekday in the allow-list must have hours; hours given for a
    /// weekday outside the allow-list are ignored (that day stays closed).
    pub fn from_settings(settings: &AvailabilitySettings) -> Result<Self, EngineError> {
        if settings.buffer_hours < 0 {
            return Err(EngineError::Configuration(format!(
                "buffer hours must be non-negative, got {}",
                settings.buffer_hours
            )));
        }
        let buffer_hours = u32::try_from(settings.buffer_hours).map_err(|_| {
            EngineError::Configuration(format!(
                "buffer hours out of range: {}",
                settings.buffer_hours
            ))
        })?;

        let mut raw_hours: [Option<&RawDayHours>; 7] = [None; 7];
        for (name, hours) in &settings.hours {
            let weekday = parse_weekday(name).ok_or_else(|| {
                EngineError::Configuration(format!("unknown weekday '{name}' in hours"))
            })?;
            raw_hours[day_index(weekday) as usize] = Some(hours);
        }

        let mut config =
            AvailabilityConfig::new(settings.owner_id.clone()).with_buffer_hours(buffer_hours);
        for name in &settings.available_days {
            let weekday = parse_weekday(name).ok_or_else(|| {
                EngineError::Configuration(format!("unknown weekday '{name}' in available days"))
            })?;
            let raw = raw_hours[day_index(weekday) as usize].ok_or_else(|| {
                EngineError::Configuration(format!("no opening hours given for {weekday}"))
            })?;
            config.set_hours(weekday, Some(DayHours::parse(&raw.open, &raw.close)?));
        }
        for weekday in (0..7u8).filter_map(weekday_from_index) {
            if raw_hours[day_index(weekday) as usize].is_some() && !config.is_open(weekday) {
                trace!(%weekday, "ignoring hours for weekday outside allow-list");
            }
        }

        if let Some(minutes) = settings.slot_granularity_minutes {
            config.slot_granularity_minutes = minutes;
        }
        if let Some(days) = settings.look_ahead_days {
            config.look_ahead_days = days;
        }
        if let Some(tz) = &settings.timezone {
            config.timezone = parse_timezone(tz)?;
        }

        config.check()?;
        Ok(config)
    }
}

/// One weekday's hours as saved, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDayHours {
    pub open: String,
    pub close: String,
}

/// Raw availability payload as stored by the owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySettings {
    pub owner_id: String,
    /// Weekday allow-list (`"monday"`, `"tue"`, ...).
    #[serde(default)]
    pub available_days: Vec<String>,
    /// Hours keyed by weekday name.
    #[serde(default)]
    pub hours: BTreeMap<String, RawDayHours>,
    #[serde(default)]
    pub buffer_hours: i64,
    #[serde(default)]
    pub slot_granularity_minutes: Option<u32>,
    #[serde(default)]
    pub look_ahead_days: Option<u32>,
    /// IANA timezone of the hours; UTC when absent.
    #[serde(default)]
    pub timezone: Option<String>,
}

impl AvailabilitySettings {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|e| EngineError::Payload(e.to_string()))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
