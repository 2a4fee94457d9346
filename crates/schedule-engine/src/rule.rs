//! Recurrence rule model.
//!
//! A [`RecurrenceRule`] is a single discriminated value: either one of the
//! product presets (`Daily`, `Weekly`, ...) or a [`CustomRule`] that carries
//! its own interval, unit and terminator. Days of the week only exist on the
//! week unit, so a rule can never hold a day set that its unit ignores.
//!
//! Day-of-week indices follow the product's `0..=6` convention where
//! `0` is Sunday.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ── Days of week ────────────────────────────────────────────────────────────

/// The `0..=6` index of a weekday (Sunday = 0).
pub fn day_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// The weekday for a `0..=6` index (Sunday = 0).
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// A set of weekdays, stored as a bitmask over day indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    pub const EMPTY: DaysOfWeek = DaysOfWeek(0);

    /// Monday through Friday.
    pub const WEEKDAYS: DaysOfWeek = DaysOfWeek(0b0011_1110);

    pub fn single(weekday: Weekday) -> Self {
        DaysOfWeek(1 << day_index(weekday))
    }

    pub fn from_weekdays(weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        let mut set = DaysOfWeek::EMPTY;
        for weekday in weekdays {
            set.insert(weekday);
        }
        set
    }

    /// Build from `0..=6` indices, rejecting anything out of range.
    pub fn from_indices(indices: impl IntoIterator<Item = u8>) -> Result<Self, ValidationError> {
        let mut set = DaysOfWeek::EMPTY;
        for index in indices {
            let weekday =
                weekday_from_index(index).ok_or(ValidationError::DayIndexOutOfRange(index))?;
            set.insert(weekday);
        }
        Ok(set)
    }

    pub fn insert(&mut self, weekday: Weekday) {
        self.0 |= 1 << day_index(weekday);
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1 << day_index(weekday)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Weekdays in ascending index order (Sunday first).
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        (0..7u8)
            .filter(move |i| self.0 & (1 << i) != 0)
            .filter_map(weekday_from_index)
    }

    pub fn indices(&self) -> Vec<u8> {
        self.iter().map(day_index).collect()
    }
}

impl TryFrom<Vec<u8>> for DaysOfWeek {
    type Error = ValidationError;

    fn try_from(indices: Vec<u8>) -> Result<Self, Self::Error> {
        DaysOfWeek::from_indices(indices)
    }
}

impl From<DaysOfWeek> for Vec<u8> {
    fn from(days: DaysOfWeek) -> Self {
        days.indices()
    }
}

// ── Rule ────────────────────────────────────────────────────────────────────

/// When a recurring series stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Terminator {
    #[default]
    Never,
    /// Stop after this many occurrences have been produced.
    After { occurrences: u32 },
    /// Stop after this date; the date itself is included if it occurs.
    On { date: NaiveDate },
}

/// The unit a custom rule steps by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "every", rename_all = "snake_case")]
pub enum RepeatUnit {
    Day,
    Week { days_of_week: DaysOfWeek },
    Month,
    Year,
}

/// A fully specified recurrence: every `interval` units, until `ends`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRule {
    pub interval: u32,
    pub repeat: RepeatUnit,
    #[serde(default)]
    pub ends: Terminator,
}

impl CustomRule {
    pub fn new(interval: u32, repeat: RepeatUnit) -> Self {
        CustomRule {
            interval,
            repeat,
            ends: Terminator::Never,
        }
    }

    pub fn ending(mut self, ends: Terminator) -> Self {
        self.ends = ends;
        self
    }
}

/// How an event repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceRule {
    /// A single, non-repeating event.
    #[default]
    None,
    Daily,
    /// Every week on the anchor's weekday.
    Weekly,
    Monthly,
    Annually,
    /// Every Monday through Friday.
    Weekdays,
    Custom(CustomRule),
}

/// Reject malformed rules before any expansion runs.
///
/// Presets are always valid. A custom rule is rejected when its interval is
/// zero, when a week-unit rule has no days, or when an `After` terminator
/// asks for zero occurrences.
pub fn validate(rule: &RecurrenceRule) -> Result<(), ValidationError> {
    let RecurrenceRule::Custom(custom) = rule else {
        return Ok(());
    };
    if custom.interval < 1 {
        return Err(ValidationError::IntervalTooSmall(custom.interval));
    }
    if let RepeatUnit::Week { days_of_week } = custom.repeat {
        if days_of_week.is_empty() {
            return Err(ValidationError::EmptyDaysOfWeek);
        }
    }
    if let Terminator::After { occurrences } = custom.ends {
        if occurrences < 1 {
            return Err(ValidationError::OccurrencesTooSmall(occurrences));
        }
    }
    Ok(())
}

impl RecurrenceRule {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(self)
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, RecurrenceRule::None)
    }

    pub fn terminator(&self) -> Terminator {
        match self {
            RecurrenceRule::Custom(custom) => custom.ends,
            _ => Terminator::Never,
        }
    }

    /// The equivalent custom rule for a series anchored at `anchor`.
    ///
    /// Returns `None` for a non-repeating rule.
    pub fn to_custom(&self, anchor: NaiveDate) -> Option<CustomRule> {
        let custom = match self {
            RecurrenceRule::None => return None,
            RecurrenceRule::Daily => CustomRule::new(1, RepeatUnit::Day),
            RecurrenceRule::Weekly => CustomRule::new(
                1,
                RepeatUnit::Week {
                    days_of_week: DaysOfWeek::single(anchor.weekday()),
                },
            ),
            RecurrenceRule::Monthly => CustomRule::new(1, RepeatUnit::Month),
            RecurrenceRule::Annually => CustomRule::new(1, RepeatUnit::Year),
            RecurrenceRule::Weekdays => CustomRule::new(
                1,
                RepeatUnit::Week {
                    days_of_week: DaysOfWeek::WEEKDAYS,
                },
            ),
            RecurrenceRule::Custom(custom) => *custom,
        };
        Some(custom)
    }

    /// This rule with its terminator replaced, as a custom rule.
    pub fn with_terminator(&self, anchor: NaiveDate, ends: Terminator) -> RecurrenceRule {
        match self.to_custom(anchor) {
            Some(custom) => RecurrenceRule::Custom(custom.ending(ends)),
            None => RecurrenceRule::None,
        }
    }

    /// Render the rule as an RFC 5545 `RRULE` value (without the `RRULE:`
    /// prefix). `UNTIL` is written as UTC midnight, pairing with a
    /// UTC-midnight `DTSTART`.
    ///
    /// Returns `None` for a non-repeating rule.
    pub fn to_rrule_string(&self) -> Option<String> {
        let mut parts = match self {
            RecurrenceRule::None => return None,
            RecurrenceRule::Daily => vec!["FREQ=DAILY".to_string()],
            RecurrenceRule::Weekly => vec!["FREQ=WEEKLY".to_string()],
            RecurrenceRule::Monthly => vec!["FREQ=MONTHLY".to_string()],
            RecurrenceRule::Annually => vec!["FREQ=YEARLY".to_string()],
            RecurrenceRule::Weekdays => vec![
                "FREQ=WEEKLY".to_string(),
                format!("BYDAY={}", byday(DaysOfWeek::WEEKDAYS)),
            ],
            RecurrenceRule::Custom(custom) => {
                let freq = match custom.repeat {
                    RepeatUnit::Day => "DAILY",
                    RepeatUnit::Week { .. } => "WEEKLY",
                    RepeatUnit::Month => "MONTHLY",
                    RepeatUnit::Year => "YEARLY",
                };
                let mut parts = vec![format!("FREQ={freq}")];
                if custom.interval != 1 {
                    parts.push(format!("INTERVAL={}", custom.interval));
                }
                if let RepeatUnit::Week { days_of_week } = custom.repeat {
                    parts.push(format!("BYDAY={}", byday(days_of_week)));
                    parts.push("WKST=SU".to_string());
                }
                parts
            }
        };
        match self.terminator() {
            Terminator::Never => {}
            Terminator::After { occurrences } => parts.push(format!("COUNT={occurrences}")),
            Terminator::On { date } => {
                parts.push(format!("UNTIL={}T000000Z", date.format("%Y%m%d")));
            }
        }
        Some(parts.join(";"))
    }
}

fn byday(days: DaysOfWeek) -> String {
    days.iter()
        .map(|d| match d {
            Weekday::Sun => "SU",
            Weekday::Mon => "MO",
            Weekday::Tue => "TU",
            Weekday::Wed => "WE",
            Weekday::Thu => "TH",
            Weekday::Fri => "FR",
            Weekday::Sat => "SA",
        })
        .collect::<Vec<_>>()
        .join(",")
}

// ── Tests ───────────────────────────────────────────────────────────────────
