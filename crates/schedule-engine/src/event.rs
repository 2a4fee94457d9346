//! Calendar event records and recurring-series lifecycle.
//!
//! An [`EventDraft`] becomes an [`EventRecord`] on [`EventDraft::save`].
//! A record is one of three kinds:
//!
//! - [`EventKind::Standalone`] — a single dated event.
//! - [`EventKind::RecurringParent`] — a series, shown as virtual instances
//!   expanded from its rule on demand and never stored one by one.
//! - [`EventKind::DetachedInstance`] — one occurrence split off a series
//!   and stored as its own record.
//!
//! Edits and deletes aimed at one instance of a series always take an
//! explicit [`EditScope`]. The engine never picks a scope on the caller's
//! behalf, and it never destroys a record: when a delete empties a series it
//! reports [`DeleteOutcome::DeleteSeries`] and the caller removes the record.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineError;
use crate::expander::{expand_excluding, ExpandOptions, Occurrence, Occurrences};
use crate::rule::{RecurrenceRule, Terminator};

pub type EventId = String;

// ── Value types ─────────────────────────────────────────────────────────────

/// Color tag shown on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    #[default]
    Blue,
    Green,
    Purple,
    Red,
    Yellow,
    Orange,
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    #[default]
    Popup,
    Email,
}

/// How and when guests are reminded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Notification {
    pub channel: NotificationChannel,
    /// Minutes before the start; `None` means at start time.
    pub lead_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub email: String,
    pub display_name: Option<String>,
}

/// Guests in invitation order, unique by email (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Guest>")]
pub struct GuestList(Vec<Guest>);

impl TryFrom<Vec<Guest>> for GuestList {
    type Error = EngineError;

    /// Later entries repeating an earlier email are dropped.
    fn try_from(guests: Vec<Guest>) -> Result<Self, Self::Error> {
        let mut list = GuestList::new();
        for guest in guests {
            list.add(&guest.email, guest.display_name)?;
        }
        Ok(list)
    }
}

impl GuestList {
    pub fn new() -> Self {
        GuestList::default()
    }

    /// Add a guest. Returns `Ok(false)` if the email is already invited.
    pub fn add(
        &mut self,
        email: &str,
        display_name: Option<String>,
    ) -> Result<bool, EngineError> {
        let email = normalize_email(email)?;
        if self.contains(&email) {
            return Ok(false);
        }
        self.0.push(Guest {
            email,
            display_name,
        });
        Ok(true)
    }

    /// Remove a guest by email. Returns whether one was removed.
    pub fn remove(&mut self, email: &str) -> bool {
        let key = email.trim().to_lowercase();
        let before = self.0.len();
        self.0.retain(|g| g.email != key);
        self.0.len() != before
    }

    pub fn contains(&self, email: &str) -> bool {
        let key = email.trim().to_lowercase();
        self.0.iter().any(|g| g.email == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Guest> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalize_email(email: &str) -> Result<String, EngineError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(EngineError::InvalidEvent(format!(
            "invalid guest email '{email}'"
        ))),
    }
}

/// When in the day an event happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventTiming {
    AllDay,
    Timed { start: NaiveTime, end: NaiveTime },
}

impl EventTiming {
    fn check(&self) -> Result<(), EngineError> {
        match self {
            EventTiming::Timed { start, end } if start >= end => Err(EngineError::InvalidEvent(
                format!("start time {start} must be before end time {end}"),
            )),
            _ => Ok(()),
        }
    }
}

/// What a saved record represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Standalone,
    RecurringParent,
    DetachedInstance {
        parent_id: EventId,
        /// The series date this instance replaces.
        original_date: NaiveDate,
    },
}

/// Which instances an edit or delete applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditScope {
    ThisOccurrence,
    ThisAndFollowing,
}

/// Field changes; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub timing: Option<EventTiming>,
    pub recurrence: Option<RecurrenceRule>,
    pub guests: Option<GuestList>,
    pub label: Option<Label>,
    pub notification: Option<Notification>,
}

// ── Draft ───────────────────────────────────────────────────────────────────

/// An event being composed, not yet saved.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: NaiveDate,
    pub timing: EventTiming,
    pub timezone: Tz,
    pub recurrence: RecurrenceRule,
    pub guests: GuestList,
    pub label: Label,
    pub notification: Notification,
}

impl EventDraft {
    /// An all-day, non-repeating draft on `date`.
    pub fn new(title: impl Into<String>, date: NaiveDate, timezone: Tz) -> Self {
        EventDraft {
            title: title.into(),
            description: String::new(),
            location: String::new(),
            date,
            timing: EventTiming::AllDay,
            timezone,
            recurrence: RecurrenceRule::None,
            guests: GuestList::new(),
            label: Label::default(),
            notification: Notification::default(),
        }
    }

    pub fn timed(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.timing = EventTiming::Timed { start, end };
        self
    }

    pub fn repeating(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = rule;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = label;
        self
    }

    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notification = notification;
        self
    }

    pub fn with_guests(mut self, guests: GuestList) -> Self {
        self.guests = guests;
        self
    }

    /// Validate the draft and turn it into a saved record with `id`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidEvent`] for an empty title or inverted times,
    /// [`EngineError::Validation`] for a malformed recurrence rule.
    pub fn save(self, id: impl Into<EventId>) -> Result<EventRecord, EngineError> {
        check_title(&self.title)?;
        self.timing.check()?;
        self.recurrence.validate()?;
        let kind = if self.recurrence.is_recurring() {
            EventKind::RecurringParent
        } else {
            EventKind::Standalone
        };
        Ok(EventRecord {
            id: id.into(),
            title: self.title,
            description: self.description,
            location: self.location,
            date: self.date,
            timing: self.timing,
            timezone: self.timezone,
            recurrence: self.recurrence,
            excluded_dates: BTreeSet::new(),
            guests: self.guests,
            label: self.label,
            notification: self.notification,
            kind,
        })
    }
}

fn check_title(title: &str) -> Result<(), EngineError> {
    if title.trim().is_empty() {
        return Err(EngineError::InvalidEvent("title must not be empty".into()));
    }
    Ok(())
}

// ── Record ──────────────────────────────────────────────────────────────────

/// One concrete instance of an event as shown on a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventInstance {
    pub event_id: EventId,
    pub date: NaiveDate,
    pub timing: EventTiming,
    /// Position in the series for virtual instances of a recurring parent.
    pub occurrence: Option<u32>,
}

/// Result of an instance edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// The record itself was changed (first instance, following scope).
    Updated,
    /// A new detached record now holds the edited occurrence.
    Detached(EventRecord),
    /// The series was cut before the occurrence; the returned record is the
    /// edited continuation.
    Split(EventRecord),
    /// No live occurrence precedes the edited one, so the returned
    /// continuation replaces the whole series. The original record is left
    /// unchanged; the caller deletes it.
    Replaced(EventRecord),
}

/// Result of an instance delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The date is excluded; the series goes on.
    Excluded,
    /// The series now ends before the deleted occurrence.
    Truncated,
    /// No occurrences remain; the caller should delete the record.
    DeleteSeries,
}

/// A saved calendar event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    date: NaiveDate,
    pub timing: EventTiming,
    timezone: Tz,
    recurrence: RecurrenceRule,
    excluded_dates: BTreeSet<NaiveDate>,
    pub guests: GuestList,
    pub label: Label,
    pub notification: Notification,
    kind: EventKind,
}

impl EventRecord {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The event date; the anchor of the series for a recurring parent.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The timezone captured when the event was created.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn recurrence(&self) -> &RecurrenceRule {
        &self.recurrence
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn excluded_dates(&self) -> &BTreeSet<NaiveDate> {
        &self.excluded_dates
    }

    /// Whether instance edits and deletes on this record need an [`EditScope`].
    pub fn requires_scope(&self) -> bool {
        self.kind == EventKind::RecurringParent
    }

    /// Up to `max_count` instances, in date order.
    pub fn instances(&self, max_count: usize) -> Result<Vec<EventInstance>, EngineError> {
        if self.kind != EventKind::RecurringParent {
            return Ok(std::iter::once(self.single_instance())
                .take(max_count)
                .collect());
        }
        let occurrences = expand_excluding(
            &self.recurrence,
            self.date,
            max_count,
            &self.excluded_dates,
            &ExpandOptions::default(),
        )?;
        Ok(occurrences
            .into_iter()
            .map(|o| self.virtual_instance(o))
            .collect())
    }

    /// Instances dated within `from..=to`, in date order.
    pub fn instances_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<EventInstance>, EngineError> {
        if self.kind != EventKind::RecurringParent {
            let instance = self.single_instance();
            return Ok(if instance.date >= from && instance.date <= to {
                vec![instance]
            } else {
                Vec::new()
            });
        }
        Ok(self
            .occurrences()?
            .take_while(|o| o.date <= to)
            .filter(|o| o.date >= from && !self.excluded_dates.contains(&o.date))
            .map(|o| self.virtual_instance(o))
            .collect())
    }

    /// Apply `patch` to a standalone event or a detached instance.
    ///
    /// # Errors
    ///
    /// A recurring parent is rejected with [`EngineError::InvalidEvent`]:
    /// edits to a series go through [`EventRecord::edit_occurrence`] with an
    /// explicit scope.
    pub fn apply(&mut self, patch: EventPatch) -> Result<(), EngineError> {
        if self.kind == EventKind::RecurringParent {
            return Err(EngineError::InvalidEvent(format!(
                "event {} is a recurring series; choose an edit scope",
                self.id
            )));
        }
        let mut updated = self.clone();
        updated.apply_fields(patch)?;
        if updated.recurrence.is_recurring() {
            if matches!(updated.kind, EventKind::DetachedInstance { .. }) {
                return Err(EngineError::InvalidEvent(format!(
                    "detached instance {} cannot repeat",
                    self.id
                )));
            }
            updated.kind = EventKind::RecurringParent;
        }
        *self = updated;
        Ok(())
    }

    /// Edit the occurrence on `date` of a recurring series.
    ///
    /// - [`EditScope::ThisOccurrence`] excludes `date` from the series and
    ///   returns a detached record (with id `new_id`) carrying the edit.
    /// - [`EditScope::ThisAndFollowing`] on the first occurrence edits the
    ///   whole series in place; on a later one it ends the series the day
    ///   before and returns the edited continuation (with id `new_id`). If
    ///   every earlier occurrence was already excluded the continuation is
    ///   returned as [`EditOutcome::Replaced`].
    ///
    /// The record is left unchanged if any step fails.
    pub fn edit_occurrence(
        &mut self,
        date: NaiveDate,
        scope: EditScope,
        patch: EventPatch,
        new_id: impl Into<EventId>,
    ) -> Result<EditOutcome, EngineError> {
        let occurrence = self.find_occurrence(date)?;
        match scope {
            EditScope::ThisOccurrence => {
                let mut detached = self.clone();
                detached.id = new_id.into();
                detached.date = date;
                detached.recurrence = RecurrenceRule::None;
                detached.excluded_dates.clear();
                detached.kind = EventKind::DetachedInstance {
                    parent_id: self.id.clone(),
                    original_date: date,
                };
                detached.apply_fields(patch)?;
                if detached.recurrence.is_recurring() {
                    return Err(EngineError::InvalidEvent(
                        "a single occurrence cannot be given its own recurrence".into(),
                    ));
                }
                self.excluded_dates.insert(date);
                debug!(event = %self.id, %date, detached = %detached.id, "detached occurrence");
                Ok(EditOutcome::Detached(detached))
            }
            EditScope::ThisAndFollowing if occurrence.sequence == 0 => {
                let mut updated = self.clone();
                updated.apply_fields(patch)?;
                if !updated.recurrence.is_recurring() {
                    updated.kind = EventKind::Standalone;
                    updated.excluded_dates.clear();
                }
                *self = updated;
                debug!(event = %self.id, "edited whole series");
                Ok(EditOutcome::Updated)
            }
            EditScope::ThisAndFollowing => {
                let mut tail = self.clone();
                tail.id = new_id.into();
                tail.date = date;
                tail.recurrence = self.continuation_rule(occurrence);
                tail.excluded_dates = self.excluded_dates.range(date..).copied().collect();
                tail.apply_fields(patch)?;
                if !tail.recurrence.is_recurring() {
                    tail.kind = EventKind::Standalone;
                    tail.excluded_dates.clear();
                }
                let head = self.truncated_before(date);
                if head.instances(1)?.is_empty() {
                    debug!(event = %self.id, %date, replacement = %tail.id, "replaced series");
                    return Ok(EditOutcome::Replaced(tail));
                }
                *self = head;
                debug!(event = %self.id, %date, continuation = %tail.id, "split series");
                Ok(EditOutcome::Split(tail))
            }
        }
    }

    /// Delete the occurrence on `date` of a recurring series.
    ///
    /// Returns [`DeleteOutcome::DeleteSeries`] when no live occurrence would
    /// remain. For [`EditScope::ThisAndFollowing`] the record is then left
    /// unchanged.
    pub fn delete_occurrence(
        &mut self,
        date: NaiveDate,
        scope: EditScope,
    ) -> Result<DeleteOutcome, EngineError> {
        let occurrence = self.find_occurrence(date)?;
        let outcome = match scope {
            EditScope::ThisAndFollowing if occurrence.sequence == 0 => DeleteOutcome::DeleteSeries,
            EditScope::ThisAndFollowing => {
                let head = self.truncated_before(date);
                if head.instances(1)?.is_empty() {
                    DeleteOutcome::DeleteSeries
                } else {
                    *self = head;
                    DeleteOutcome::Truncated
                }
            }
            EditScope::ThisOccurrence => {
                self.excluded_dates.insert(date);
                if self.instances(1)?.is_empty() {
                    DeleteOutcome::DeleteSeries
                } else {
                    DeleteOutcome::Excluded
                }
            }
        };
        debug!(event = %self.id, %date, ?scope, ?outcome, "deleted occurrence");
        Ok(outcome)
    }

    // ── Internal helpers ────────────────────────────────────────────────

    fn occurrences(&self) -> Result<Occurrences, EngineError> {
        Ok(Occurrences::new(
            &self.recurrence,
            self.date,
            &ExpandOptions::default(),
        )?)
    }

    /// The live (non-excluded) occurrence of this series on `date`.
    fn find_occurrence(&self, date: NaiveDate) -> Result<Occurrence, EngineError> {
        if self.kind != EventKind::RecurringParent {
            return Err(EngineError::NotRecurring(self.id.clone()));
        }
        let not_found = || EngineError::NotAnOccurrence {
            event_id: self.id.clone(),
            date,
        };
        if self.excluded_dates.contains(&date) {
            return Err(not_found());
        }
        self.occurrences()?
            .take_while(|o| o.date <= date)
            .find(|o| o.date == date)
            .ok_or_else(not_found)
    }

    /// The rule for a series continuing from `from`.
    fn continuation_rule(&self, from: Occurrence) -> RecurrenceRule {
        match self.recurrence.terminator() {
            Terminator::After { occurrences } => self.recurrence.with_terminator(
                self.date,
                Terminator::After {
                    occurrences: occurrences.saturating_sub(from.sequence),
                },
            ),
            _ => self.recurrence,
        }
    }

    /// A copy of this series ending the day before `date`, keeping only the
    /// exclusions before it.
    fn truncated_before(&self, date: NaiveDate) -> EventRecord {
        let mut head = self.clone();
        head.excluded_dates.retain(|d| *d < date);
        if let Some(last) = date.pred_opt() {
            head.recurrence = head
                .recurrence
                .with_terminator(head.date, Terminator::On { date: last });
        }
        head
    }

    fn apply_fields(&mut self, patch: EventPatch) -> Result<(), EngineError> {
        if let Some(title) = patch.title {
            check_title(&title)?;
            self.title = title;
        }
        if let Some(timing) = patch.timing {
            timing.check()?;
            self.timing = timing;
        }
        if let Some(rule) = patch.recurrence {
            rule.validate()?;
            self.recurrence = rule;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(guests) = patch.guests {
            self.guests = guests;
        }
        if let Some(label) = patch.label {
            self.label = label;
        }
        if let Some(notification) = patch.notification {
            self.notification = notification;
        }
        Ok(())
    }

    fn single_instance(&self) -> EventInstance {
        EventInstance {
            event_id: self.id.clone(),
            date: self.date,
            timing: self.timing,
            occurrence: None,
        }
    }

    fn virtual_instance(&self, occurrence: Occurrence) -> EventInstance {
        EventInstance {
            event_id: self.id.clone(),
            date: occurrence.date,
            timing: self.timing,
            occurrence: Some(occurrence.sequence),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{CustomRule, RepeatUnit};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn dates(instances: &[EventInstance]) -> Vec<NaiveDate> {
        instances.iter().map(|i| i.date).collect()
    }

    fn daily_for(n: u32) -> RecurrenceRule {
        RecurrenceRule::Custom(
            CustomRule::new(1, RepeatUnit::Day).ending(Terminator::After { occurrences: n }),
        )
    }

    // Six daily stand-ups from Monday 2026-03-02
    fn standup() -> EventRecord {
        EventDraft::new("Stand-up", date(2026, 3, 2), Tz::Europe__London)
            .timed(hm(9, 0), hm(9, 15))
            .repeating(daily_for(6))
            .save("evt-1")
            .unwrap()
    }

    fn retitle(title: &str) -> EventPatch {
        EventPatch {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    // ── save ────────────────────────────────────────────────────────────

    #[test]
    fn test_save_standalone() {
        let record = EventDraft::new("Dentist", date(2026, 4, 1), Tz::America__Chicago)
            .with_location("Main St")
            .with_label(Label::Red)
            .save("evt-9")
            .unwrap();
        assert_eq!(record.id(), "evt-9");
        assert_eq!(record.kind(), &EventKind::Standalone);
        assert_eq!(record.timezone(), Tz::America__Chicago);
        assert!(!record.requires_scope());

        let instances = record.instances(10).unwrap();
        assert_eq!(dates(&instances), vec![date(2026, 4, 1)]);
        assert_eq!(instances[0].occurrence, None);
    }

    #[test]
    fn test_save_recurring_becomes_parent() {
        let record = standup();
        assert_eq!(record.kind(), &EventKind::RecurringParent);
        assert!(record.requires_scope());
        let instances = record.instances(3).unwrap();
        assert_eq!(
            dates(&instances),
            vec![date(2026, 3, 2), date(2026, 3, 3), date(2026, 3, 4)]
        );
        assert_eq!(instances[2].occurrence, Some(2));
        assert_eq!(
            instances[0].timing,
            EventTiming::Timed {
                start: hm(9, 0),
                end: hm(9, 15)
            }
        );
    }

    #[test]
    fn test_save_rejects_bad_drafts() {
        let base = EventDraft::new("x", date(2026, 4, 1), Tz::UTC);

        let err = EventDraft { title: "  ".into(), ..base.clone() }.save("a").unwrap_err();
        assert!(matches!(err, EngineError::InvalidEvent(_)));

        let err = base.clone().timed(hm(10, 0), hm(9, 0)).save("a").unwrap_err();
        assert!(err.to_string().contains("must be before"), "got: {err}");

        let err = base
            .repeating(RecurrenceRule::Custom(CustomRule::new(0, RepeatUnit::Day)))
            .save("a")
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    // ── guests ──────────────────────────────────────────────────────────

    #[test]
    fn test_guest_list_is_unique_by_email() {
        let mut guests = GuestList::new();
        assert!(guests.add("Ana@Example.com", Some("Ana".into())).unwrap());
        assert!(guests.add("bo@example.com", None).unwrap());
        assert!(!guests.add(" ana@example.com ", None).unwrap());
        assert_eq!(guests.len(), 2);

        let order: Vec<&str> = guests.iter().map(|g| g.email.as_str()).collect();
        assert_eq!(order, vec!["ana@example.com", "bo@example.com"]);

        assert!(guests.remove("ANA@example.com"));
        assert!(!guests.contains("ana@example.com"));
        assert!(!guests.remove("nobody@example.com"));
    }

    #[test]
    fn test_guest_list_deserializes_through_add() {
        let guests: GuestList = serde_json::from_str(
            r#"[
                {"email": "Ana@Example.com", "display_name": "Ana"},
                {"email": "ana@example.com", "display_name": null},
                {"email": "bo@example.com"}
            ]"#,
        )
        .unwrap();
        let emails: Vec<&str> = guests.iter().map(|g| g.email.as_str()).collect();
        assert_eq!(emails, vec!["ana@example.com", "bo@example.com"]);
        assert_eq!(guests.iter().next().unwrap().display_name.as_deref(), Some("Ana"));

        let err = serde_json::from_str::<GuestList>(r#"[{"email": "nobody"}]"#).unwrap_err();
        assert!(err.to_string().contains("invalid guest email"), "got: {err}");
    }

    #[test]
    fn test_guest_list_rejects_invalid_email() {
        let mut guests = GuestList::new();
        assert!(guests.add("not-an-email", None).is_err());
        assert!(guests.add("@example.com", None).is_err());
        assert!(guests.is_empty());
    }

    // ── apply ───────────────────────────────────────────────────────────

    #[test]
    fn test_apply_to_standalone() {
        let mut record = EventDraft::new("Lunch", date(2026, 4, 1), Tz::UTC)
            .save("evt-2")
            .unwrap();
        record
            .apply(EventPatch {
                title: Some("Team lunch".into()),
                notification: Some(Notification {
                    channel: NotificationChannel::Email,
                    lead_minutes: Some(30),
                }),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(record.title, "Team lunch");
        assert_eq!(record.notification.lead_minutes, Some(30));
    }

    #[test]
    fn test_apply_recurrence_promotes_standalone() {
        let mut record = EventDraft::new("Gym", date(2026, 4, 1), Tz::UTC)
            .save("evt-3")
            .unwrap();
        record
            .apply(EventPatch {
                recurrence: Some(RecurrenceRule::Weekly),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(record.kind(), &EventKind::RecurringParent);
        assert_eq!(record.instances(2).unwrap()[1].date, date(2026, 4, 8));
    }

    #[test]
    fn test_apply_to_series_requires_scope() {
        let mut record = standup();
        let err = record.apply(retitle("Sync")).unwrap_err();
        assert!(err.to_string().contains("edit scope"), "got: {err}");
        assert_eq!(record.title, "Stand-up");
    }

    // ── edit_occurrence ─────────────────────────────────────────────────

    #[test]
    fn test_edit_this_occurrence_detaches() {
        let mut record = standup();
        let outcome = record
            .edit_occurrence(
                date(2026, 3, 4),
                EditScope::ThisOccurrence,
                retitle("Stand-up (moved)"),
                "evt-1a",
            )
            .unwrap();

        let EditOutcome::Detached(detached) = outcome else {
            panic!("expected a detached instance, got {outcome:?}");
        };
        assert_eq!(detached.id(), "evt-1a");
        assert_eq!(detached.title, "Stand-up (moved)");
        assert_eq!(detached.date(), date(2026, 3, 4));
        assert_eq!(detached.recurrence(), &RecurrenceRule::None);
        assert_eq!(
            detached.kind(),
            &EventKind::DetachedInstance {
                parent_id: "evt-1".into(),
                original_date: date(2026, 3, 4)
            }
        );

        // Parent keeps its title and skips the detached date
        assert_eq!(record.title, "Stand-up");
        let remaining = dates(&record.instances(10).unwrap());
        assert_eq!(remaining.len(), 5);
        assert!(!remaining.contains(&date(2026, 3, 4)));
    }

    #[test]
    fn test_detached_instance_cannot_repeat() {
        let mut record = standup();
        let err = record
            .edit_occurrence(
                date(2026, 3, 3),
                EditScope::ThisOccurrence,
                EventPatch {
                    recurrence: Some(RecurrenceRule::Daily),
                    ..Default::default()
                },
                "evt-1b",
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidEvent(_)));
        assert!(record.excluded_dates().is_empty());
    }

    #[test]
    fn test_edit_first_and_following_updates_series() {
        let mut record = standup();
        let outcome = record
            .edit_occurrence(
                date(2026, 3, 2),
                EditScope::ThisAndFollowing,
                retitle("Daily sync"),
                "unused",
            )
            .unwrap();
        assert_eq!(outcome, EditOutcome::Updated);
        assert_eq!(record.id(), "evt-1");
        assert_eq!(record.title, "Daily sync");
        assert_eq!(record.instances(10).unwrap().len(), 6);
    }

    #[test]
    fn test_edit_later_and_following_splits_series() {
        let mut record = standup();
        record
            .delete_occurrence(date(2026, 3, 6), EditScope::ThisOccurrence)
            .unwrap();
        let outcome = record
            .edit_occurrence(
                date(2026, 3, 4),
                EditScope::ThisAndFollowing,
                retitle("Sync v2"),
                "evt-1c",
            )
            .unwrap();
        let EditOutcome::Split(tail) = outcome else {
            panic!("expected a split, got {outcome:?}");
        };

        assert_eq!(
            dates(&record.instances(10).unwrap()),
            vec![date(2026, 3, 2), date(2026, 3, 3)]
        );
        assert!(record.excluded_dates().is_empty());

        assert_eq!(tail.id(), "evt-1c");
        assert_eq!(tail.title, "Sync v2");
        assert_eq!(tail.kind(), &EventKind::RecurringParent);
        assert_eq!(tail.recurrence().terminator(), Terminator::After { occurrences: 4 });
        // The exclusion on the 6th moved with the continuation
        assert_eq!(
            dates(&tail.instances(10).unwrap()),
            vec![date(2026, 3, 4), date(2026, 3, 5), date(2026, 3, 7)]
        );
    }

    #[test]
    fn test_edit_following_first_live_occurrence_replaces_series() {
        let mut record = standup();
        record
            .delete_occurrence(date(2026, 3, 2), EditScope::ThisOccurrence)
            .unwrap();
        let before = record.clone();
        let outcome = record
            .edit_occurrence(
                date(2026, 3, 3),
                EditScope::ThisAndFollowing,
                retitle("Sync v2"),
                "evt-1e",
            )
            .unwrap();
        let EditOutcome::Replaced(replacement) = outcome else {
            panic!("expected a replacement, got {outcome:?}");
        };

        assert_eq!(record, before);
        assert_eq!(replacement.id(), "evt-1e");
        assert_eq!(replacement.title, "Sync v2");
        assert!(replacement.excluded_dates().is_empty());
        assert_eq!(
            dates(&replacement.instances(10).unwrap()),
            vec![
                date(2026, 3, 3),
                date(2026, 3, 4),
                date(2026, 3, 5),
                date(2026, 3, 6),
                date(2026, 3, 7)
            ]
        );
    }

    #[test]
    fn test_failed_split_leaves_series_untouched() {
        let mut record = standup();
        record
            .delete_occurrence(date(2026, 3, 6), EditScope::ThisOccurrence)
            .unwrap();
        let before = record.clone();
        let err = record
            .edit_occurrence(
                date(2026, 3, 4),
                EditScope::ThisAndFollowing,
                retitle(""),
                "evt-1d",
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidEvent(_)));
        assert_eq!(record, before);
    }

    #[test]
    fn test_edit_requires_real_occurrence() {
        let mut record = standup();
        let err = record
            .edit_occurrence(
                date(2026, 3, 20),
                EditScope::ThisOccurrence,
                retitle("x"),
                "n",
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::NotAnOccurrence { .. }));

        let mut single = EventDraft::new("One-off", date(2026, 3, 2), Tz::UTC)
            .save("evt-4")
            .unwrap();
        let err = single
            .edit_occurrence(
                date(2026, 3, 2),
                EditScope::ThisOccurrence,
                retitle("x"),
                "n",
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::NotRecurring(_)));
    }

    // ── delete_occurrence ───────────────────────────────────────────────

    #[test]
    fn test_delete_this_occurrence_excludes_date() {
        let mut record = standup();
        let outcome = record
            .delete_occurrence(date(2026, 3, 3), EditScope::ThisOccurrence)
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Excluded);
        assert_eq!(record.instances(10).unwrap().len(), 5);

        // Already gone
        let err = record
            .delete_occurrence(date(2026, 3, 3), EditScope::ThisOccurrence)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotAnOccurrence { .. }));
    }

    #[test]
    fn test_delete_following_truncates() {
        let mut record = standup();
        let outcome = record
            .delete_occurrence(date(2026, 3, 5), EditScope::ThisAndFollowing)
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Truncated);
        assert_eq!(
            dates(&record.instances(10).unwrap()),
            vec![date(2026, 3, 2), date(2026, 3, 3), date(2026, 3, 4)]
        );
    }

    #[test]
    fn test_delete_from_first_reports_series_deletion() {
        let mut record = standup();
        let outcome = record
            .delete_occurrence(date(2026, 3, 2), EditScope::ThisAndFollowing)
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::DeleteSeries);
        // The record itself is untouched; the caller deletes it
        assert_eq!(record.instances(10).unwrap().len(), 6);
    }

    #[test]
    fn test_delete_following_first_live_occurrence_reports_series_deletion() {
        let mut record = standup();
        let outcome = record
            .delete_occurrence(date(2026, 3, 2), EditScope::ThisOccurrence)
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Excluded);

        let outcome = record
            .delete_occurrence(date(2026, 3, 3), EditScope::ThisAndFollowing)
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::DeleteSeries);
        assert_eq!(record.kind(), &EventKind::RecurringParent);
        assert_eq!(record.instances(10).unwrap().len(), 5);
    }

    #[test]
    fn test_delete_last_remaining_occurrence() {
        let mut record = EventDraft::new("Once more", date(2026, 3, 2), Tz::UTC)
            .repeating(daily_for(1))
            .save("evt-5")
            .unwrap();
        let outcome = record
            .delete_occurrence(date(2026, 3, 2), EditScope::ThisOccurrence)
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::DeleteSeries);
    }

    // ── instances_between ───────────────────────────────────────────────

    #[test]
    fn test_instances_between_unbounded_series() {
        let record = EventDraft::new("Review", date(2026, 1, 5), Tz::UTC)
            .repeating(RecurrenceRule::Weekly)
            .save("evt-6")
            .unwrap();
        let instances = record
            .instances_between(date(2026, 3, 1), date(2026, 3, 31))
            .unwrap();
        assert_eq!(
            dates(&instances),
            vec![
                date(2026, 3, 2),
                date(2026, 3, 9),
                date(2026, 3, 16),
                date(2026, 3, 23),
                date(2026, 3, 30)
            ]
        );
        assert_eq!(instances[0].occurrence, Some(8));
    }

    #[test]
    fn test_instances_between_standalone() {
        let record = EventDraft::new("Trip", date(2026, 5, 1), Tz::UTC)
            .save("evt-7")
            .unwrap();
        assert!(record
            .instances_between(date(2026, 3, 1), date(2026, 3, 31))
            .unwrap()
            .is_empty());
        assert_eq!(
            record
                .instances_between(date(2026, 5, 1), date(2026, 5, 1))
                .unwrap()
                .len(),
            1
        );
    }
}
