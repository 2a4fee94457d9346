//! RFC 5545 interop.
//!
//! Exports a rule and its anchor date as an [`rrule::RRuleSet`] so callers
//! can hand a series to iCalendar-speaking backends. Dates are floating, so
//! `DTSTART` is written as UTC midnight of the anchor.
//!
//! The exported set follows RFC 5545 semantics, which differ from
//! [`crate::expander`] in one place: a month or year step landing on a day
//! the target month lacks is skipped, matching [`MonthOverflow::Skip`]
//! rather than the default clamp.
//!
//! [`MonthOverflow::Skip`]: crate::expander::MonthOverflow::Skip

use chrono::{NaiveDate, Utc};
use rrule::RRuleSet;

use crate::error::EngineError;
use crate::rule::RecurrenceRule;

/// The iCalendar text (`DTSTART` + `RRULE` lines) for a series.
///
/// Returns `Ok(None)` for a non-repeating rule.
pub fn to_ical_text(
    rule: &RecurrenceRule,
    anchor: NaiveDate,
) -> Result<Option<String>, EngineError> {
    rule.validate()?;
    Ok(rule.to_rrule_string().map(|rrule| {
        format!(
            "DTSTART:{}T000000Z\nRRULE:{}",
            anchor.format("%Y%m%d"),
            rrule
        )
    }))
}

/// Build an [`RRuleSet`] for a series anchored at `anchor`.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] for a malformed rule,
/// [`EngineError::NotRecurring`] for [`RecurrenceRule::None`], or
/// [`EngineError::Interop`] if the `rrule` crate rejects the rendered text.
pub fn to_rrule_set(rule: &RecurrenceRule, anchor: NaiveDate) -> Result<RRuleSet, EngineError> {
    let text = to_ical_text(rule, anchor)?
        .ok_or_else(|| EngineError::NotRecurring(format!("rule anchored at {anchor}")))?;
    text.parse::<RRuleSet>()
        .map_err(|e| EngineError::Interop(format!("'{}': {}", text, e)))
}

/// Dates of the first `limit` instances of an exported set.
pub fn rrule_set_dates(set: RRuleSet, limit: u16) -> Vec<NaiveDate> {
    set.all(limit)
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────────────
