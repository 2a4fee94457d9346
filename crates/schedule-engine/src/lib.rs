//! # schedule-engine
//!
//! Deterministic scheduling core for calendar and booking front ends.
//!
//! The engine expands recurrence rules into concrete occurrence dates,
//! computes bookable dates and time slots from per-weekday business hours,
//! and manages the lifecycle of recurring events. Every function takes its
//! "now" and timezone as explicit inputs; nothing reads the system clock or
//! touches shared state, so identical inputs always give identical output.
//!
//! ## Modules
//!
//! - [`rule`] — Recurrence rule model and validation
//! - [`expander`] — Rule + anchor date → bounded list of occurrence dates
//! - [`ical`] — Export rules as RFC 5545 `RRULE` sets
//! - [`availability`] — Per-weekday business hours, buffer and slot settings
//! - [`slots`] — Candidate booking dates and per-day time slots
//! - [`event`] — Event records, virtual instances and scoped series edits
//! - [`time`] — Clock-free timezone and time-of-day helpers
//! - [`error`] — Error types
//!
//! The engine only proposes candidates. It does not track existing bookings
//! or prevent double-booking; callers check candidates against their store.

pub mod availability;
pub mod error;
pub mod event;
pub mod expander;
pub mod ical;
pub mod rule;
pub mod slots;
pub mod time;

pub use availability::{AvailabilityConfig, AvailabilitySettings, DayHours};
pub use error::{EngineError, ValidationError};
pub use event::{
    DeleteOutcome, EditOutcome, EditScope, EventDraft, EventInstance, EventKind, EventPatch,
    EventRecord, EventTiming, Guest, GuestList, Label, Notification, NotificationChannel,
};
pub use expander::{
    expand, expand_excluding, expand_with_options, ExpandOptions, MonthOverflow, Occurrence,
    Occurrences, WeekStartDay,
};
pub use ical::to_rrule_set;
pub use rule::{validate, CustomRule, DaysOfWeek, RecurrenceRule, RepeatUnit, Terminator};
pub use slots::{bookable_days, candidate_dates, default_time_slots, time_slots, BookableDay};
