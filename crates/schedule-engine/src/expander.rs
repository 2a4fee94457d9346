//! Recurrence expansion: rule + anchor date → concrete occurrence dates.
//!
//! Expansion is a pure function of `(rule, anchor, max_count)` plus
//! optional [`ExpandOptions`]. The same inputs always produce the same
//! dates, and every call is bounded by `max_count` and the rule's
//! [`Terminator`].
//!
//! # Stepping
//!
//! - Day, month and year units compute occurrence `i` directly from the
//!   anchor (`anchor + i·interval·unit`), so month-end clamping never
//!   accumulates drift.
//! - Week units walk cycles of `interval` weeks. Each cycle emits the
//!   configured weekdays in chronological order within the week and drops
//!   any date before the anchor.
//! - `Weekdays` steps one day at a time and keeps Monday–Friday.
//!
//! # Month overflow
//!
//! When the anchor's day of month does not exist in a target month
//! (Jan 31 → Feb, Feb 29 → a common year), [`MonthOverflow::Clamp`] moves
//! the occurrence to the last day of that month and
//! [`MonthOverflow::Skip`] drops that period, as RFC 5545 does.

use std::collections::{BTreeSet, VecDeque};

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, ValidationError};
use crate::rule::{validate, DaysOfWeek, RecurrenceRule, RepeatUnit, Terminator};

// ── Options ─────────────────────────────────────────────────────────────────

/// Which day begins a weekly cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStartDay {
    /// Matches the `0..=6` day index convention (Sunday = 0).
    #[default]
    Sunday,
    /// ISO 8601.
    Monday,
}

impl WeekStartDay {
    fn days_from_start(self, weekday: Weekday) -> u64 {
        match self {
            WeekStartDay::Sunday => weekday.num_days_from_sunday() as u64,
            WeekStartDay::Monday => weekday.num_days_from_monday() as u64,
        }
    }
}

/// What to do when the anchor's day of month is missing from a target month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthOverflow {
    /// Use the last day of the target month (Feb 29 → Feb 28).
    #[default]
    Clamp,
    /// Produce no occurrence for that period.
    Skip,
}

/// Options for [`expand_with_options`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandOptions {
    pub week_start: WeekStartDay,
    pub month_overflow: MonthOverflow,
}

/// One concrete date of a recurring series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Occurrence {
    /// Zero-based position in the full series, before any exclusions.
    pub sequence: u32,
    pub date: NaiveDate,
}

// ── Public API ──────────────────────────────────────────────────────────────

/// Expand `rule` from `anchor`, producing at most `max_count` occurrences.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] if the rule is malformed; nothing is
/// expanded in that case.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use schedule_engine::expander::expand;
/// use schedule_engine::rule::{CustomRule, RecurrenceRule, RepeatUnit};
///
/// let anchor = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
/// let rule = RecurrenceRule::Custom(CustomRule::new(2, RepeatUnit::Day));
/// let dates: Vec<_> = expand(&rule, anchor, 3)
///     .unwrap()
///     .into_iter()
///     .map(|o| o.date.to_string())
///     .collect();
/// assert_eq!(dates, ["2026-03-02", "2026-03-04", "2026-03-06"]);
/// ```
pub fn expand(
    rule: &RecurrenceRule,
    anchor: NaiveDate,
    max_count: usize,
) -> Result<Vec<Occurrence>, EngineError> {
    expand_with_options(rule, anchor, max_count, &ExpandOptions::default())
}

/// Expand `rule` from `anchor` with explicit week-start and month-overflow
/// policies.
pub fn expand_with_options(
    rule: &RecurrenceRule,
    anchor: NaiveDate,
    max_count: usize,
    options: &ExpandOptions,
) -> Result<Vec<Occurrence>, EngineError> {
    let occurrences: Vec<Occurrence> = Occurrences::new(rule, anchor, options)?
        .take(max_count)
        .collect();
    debug!(
        ?rule,
        %anchor,
        max_count,
        produced = occurrences.len(),
        "expanded recurrence rule"
    );
    Ok(occurrences)
}

/// Expand `rule` from `anchor`, leaving out `excluded` dates.
///
/// Excluded dates still consume `After(n)` occurrences (removing an instance
/// does not extend the series) but do not count toward `max_count`.
pub fn expand_excluding(
    rule: &RecurrenceRule,
    anchor: NaiveDate,
    max_count: usize,
    excluded: &BTreeSet<NaiveDate>,
    options: &ExpandOptions,
) -> Result<Vec<Occurrence>, EngineError> {
    let occurrences: Vec<Occurrence> = Occurrences::new(rule, anchor, options)?
        .filter(|o| !excluded.contains(&o.date))
        .take(max_count)
        .collect();
    debug!(
        %anchor,
        excluded = excluded.len(),
        produced = occurrences.len(),
        "expanded recurrence rule with exclusions"
    );
    Ok(occurrences)
}

// ── Lazy iterator ───────────────────────────────────────────────────────────

/// How the iterator advances from one period to the next.
#[derive(Debug, Clone)]
enum Plan {
    Once,
    Days { interval: u64 },
    Weekdays,
    Weeks {
        interval: u64,
        origin: NaiveDate,
        offsets: Vec<u64>,
    },
    Months { interval: u64 },
}

enum Step {
    Emit(NaiveDate),
    Skip,
    Exhausted,
}

/// Lazy, terminator-aware stream of occurrences.
///
/// Unbounded for `Terminator::Never`; callers bound it with `take`.
#[derive(Debug, Clone)]
pub struct Occurrences {
    anchor: NaiveDate,
    plan: Plan,
    ends: Terminator,
    overflow: MonthOverflow,
    period: u64,
    pending: VecDeque<NaiveDate>,
    emitted: u32,
    done: bool,
}

impl Occurrences {
    /// Validate `rule` and prepare to expand it from `anchor`.
    pub fn new(
        rule: &RecurrenceRule,
        anchor: NaiveDate,
        options: &ExpandOptions,
    ) -> Result<Self, ValidationError> {
        validate(rule)?;
        let plan = match rule {
            RecurrenceRule::None => Plan::Once,
            RecurrenceRule::Weekdays => Plan::Weekdays,
            _ => match rule.to_custom(anchor) {
                Some(custom) => {
                    let interval = u64::from(custom.interval);
                    match custom.repeat {
                        RepeatUnit::Day => Plan::Days { interval },
                        RepeatUnit::Week { days_of_week } => Plan::Weeks {
                            interval,
                            origin: week_origin(anchor, options.week_start),
                            offsets: week_offsets(days_of_week, options.week_start),
                        },
                        RepeatUnit::Month => Plan::Months { interval },
                        RepeatUnit::Year => Plan::Months {
                            interval: interval * 12,
                        },
                    }
                }
                None => Plan::Once,
            },
        };
        Ok(Occurrences {
            anchor,
            plan,
            ends: rule.terminator(),
            overflow: options.month_overflow,
            period: 0,
            pending: VecDeque::new(),
            emitted: 0,
            done: false,
        })
    }

    fn next_candidate(&mut self) -> Option<NaiveDate> {
        loop {
            if let Some(date) = self.pending.pop_front() {
                return Some(date);
            }
            let step = self.step_period();
            self.period += 1;
            match step {
                Step::Emit(date) => return Some(date),
                Step::Skip => continue,
                Step::Exhausted => return None,
            }
        }
    }

    fn step_period(&mut self) -> Step {
        let anchor = self.anchor;
        let period = self.period;
        match &self.plan {
            Plan::Once => {
                if period == 0 {
                    Step::Emit(anchor)
                } else {
                    Step::Exhausted
                }
            }
            Plan::Days { interval } => match add_days(anchor, period, *interval) {
                Some(date) => Step::Emit(date),
                None => Step::Exhausted,
            },
            Plan::Weekdays => match add_days(anchor, period, 1) {
                Some(date) if is_weekday(date) => Step::Emit(date),
                Some(_) => Step::Skip,
                None => Step::Exhausted,
            },
            Plan::Months { interval } => {
                let Some(months) = period
                    .checked_mul(*interval)
                    .and_then(|m| u32::try_from(m).ok())
                else {
                    return Step::Exhausted;
                };
                add_months(anchor, months, self.overflow)
            }
            Plan::Weeks {
                interval,
                origin,
                offsets,
            } => {
                let Some(cycle_start) = add_days(*origin, period, interval * 7) else {
                    return Step::Exhausted;
                };
                for offset in offsets {
                    match cycle_start.checked_add_days(Days::new(*offset)) {
                        Some(date) if date >= anchor => self.pending.push_back(date),
                        Some(_) => {}
                        None => break,
                    }
                }
                if self.pending.is_empty() && period > 0 {
                    return Step::Exhausted;
                }
                Step::Skip
            }
        }
    }
}

impl Iterator for Occurrences {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        if self.done {
            return None;
        }
        if let Terminator::After { occurrences } = self.ends {
            if self.emitted >= occurrences {
                self.done = true;
                return None;
            }
        }
        let Some(date) = self.next_candidate() else {
            self.done = true;
            return None;
        };
        if let Terminator::On { date: until } = self.ends {
            if date > until {
                self.done = true;
                return None;
            }
        }
        let occurrence = Occurrence {
            sequence: self.emitted,
            date,
        };
        self.emitted += 1;
        Some(occurrence)
    }
}

// ── Internal helpers ────────────────────────────────────────────────────────

/// The first day of the week containing `anchor`.
fn week_origin(anchor: NaiveDate, week_start: WeekStartDay) -> NaiveDate {
    anchor
        .checked_sub_days(Days::new(week_start.days_from_start(anchor.weekday())))
        .unwrap_or(anchor)
}

/// Day offsets from the start of the week, in chronological order.
fn week_offsets(days: DaysOfWeek, week_start: WeekStartDay) -> Vec<u64> {
    let mut offsets: Vec<u64> = days
        .iter()
        .map(|d| week_start.days_from_start(d))
        .collect();
    offsets.sort_unstable();
    offsets
}

fn add_days(start: NaiveDate, period: u64, interval: u64) -> Option<NaiveDate> {
    let days = period.checked_mul(interval)?;
    start.checked_add_days(Days::new(days))
}

fn add_months(anchor: NaiveDate, months: u32, overflow: MonthOverflow) -> Step {
    match overflow {
        MonthOverflow::Clamp => match anchor.checked_add_months(Months::new(months)) {
            Some(date) => Step::Emit(date),
            None => Step::Exhausted,
        },
        MonthOverflow::Skip => {
            let Some(first) = anchor
                .with_day(1)
                .and_then(|d| d.checked_add_months(Months::new(months)))
            else {
                return Step::Exhausted;
            };
            match first.with_day(anchor.day()) {
                Some(date) => Step::Emit(date),
                None => Step::Skip,
            }
        }
    }
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

// ── Tests ───────────────────────────────────────────────────────────────────
