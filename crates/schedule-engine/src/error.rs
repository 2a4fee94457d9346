//! Error types for schedule-engine operations.

use chrono::{NaiveDate, Weekday};
use thiserror::Error;

/// Why a recurrence rule was rejected before expansion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("weekly rule must repeat on at least one day of the week")]
    EmptyDaysOfWeek,

    #[error("interval must be at least 1, got {0}")]
    IntervalTooSmall(u32),

    #[error("occurrence count must be at least 1, got {0}")]
    OccurrencesTooSmall(u32),

    #[error("day of week index out of range 0..=6: {0}")]
    DayIndexOutOfRange(u8),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid recurrence rule: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A legitimately empty answer, not a misconfiguration.
    #[error("No availability on {weekday} ({date})")]
    NoAvailability { date: NaiveDate, weekday: Weekday },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("{date} is not an occurrence of event {event_id}")]
    NotAnOccurrence { event_id: String, date: NaiveDate },

    #[error("Event {0} is not a recurring series")]
    NotRecurring(String),

    #[error("Malformed payload: {0}")]
    Payload(String),

    #[error("RRULE interop error: {0}")]
    Interop(String),
}

impl EngineError {
    /// `true` for an empty-but-valid availability answer.
    pub fn is_no_availability(&self) -> bool {
        matches!(self, EngineError::NoAvailability { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
