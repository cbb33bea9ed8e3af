// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// Content shared by the local and the remote view of a calendar event.
pub trait Event {
    /// The title of the event.
    fn title(&self) -> &str;

    /// The description of the event, if available.
    fn description(&self) -> Option<&str>;

    /// The start of the event.
    fn start(&self) -> Timestamp;

    /// The end of the event.
    fn end(&self) -> Timestamp;

    /// Whether the event spans whole days.
    fn is_all_day(&self) -> bool;

    /// The location of the event, if available.
    fn location(&self) -> Option<&str>;

    /// The recurrence rule (RFC 5545 `RRULE` value), if available.
    fn recurrence_rule(&self) -> Option<&str>;
}

/// The authoritative local record of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEvent {
    /// Opaque local identifier, stable for the event's lifetime.
    pub id: String,

    /// The title of the event.
    pub title: String,

    /// The description of the event, if available.
    #[serde(default)]
    pub description: Option<String>,

    /// The start of the event.
    pub start: Timestamp,

    /// The end of the event.
    pub end: Timestamp,

    /// Whether the event spans whole days.
    #[serde(default)]
    pub is_all_day: bool,

    /// The location of the event, if available.
    #[serde(default)]
    pub location: Option<String>,

    /// The recurrence rule, if available.
    #[serde(default)]
    pub recurrence_rule: Option<String>,

    /// Identifier assigned by the provider once the event has been pushed.
    #[serde(default)]
    pub remote_id: Option<String>,

    /// The provider calendar this event belongs to.
    /// Events without one are local-only.
    #[serde(default)]
    pub remote_calendar_id: Option<String>,

    /// Last successful push or pull reconciliation for this event.
    #[serde(default)]
    pub last_pushed_at: Option<Timestamp>,

    /// Last local mutation.
    pub last_modified_at: Timestamp,

    /// The local copy has changes the provider has not seen yet.
    #[serde(default)]
    pub needs_push: bool,
}

impl LocalEvent {
    /// Creates a new bound event from a provider snapshot.
    pub fn from_remote(id: String, remote: &RemoteEvent, now: Timestamp) -> Self {
        let mut event = Self {
            id,
            title: String::new(),
            description: None,
            start: remote.start,
            end: remote.end,
            is_all_day: false,
            location: None,
            recurrence_rule: None,
            remote_id: Some(remote.remote_id.clone()),
            remote_calendar_id: Some(remote.remote_calendar_id.clone()),
            last_pushed_at: Some(now),
            last_modified_at: now,
            needs_push: false,
        };
        event.copy_content_from(remote);
        event
    }

    /// Whether the event is linked to a provider event.
    pub fn is_bound(&self) -> bool {
        self.remote_id.is_some() && self.remote_calendar_id.is_some()
    }

    /// Whether the event was modified after its last sync point.
    /// An event that was never synced always counts as modified.
    pub fn modified_since_sync(&self) -> bool {
        match self.last_pushed_at {
            Some(pushed) => self.last_modified_at > pushed,
            None => true,
        }
    }

    /// Recomputes `needs_push` from the timestamps and the calendar binding.
    pub fn refresh_needs_push(&mut self) {
        self.needs_push = self.remote_calendar_id.is_some() && self.modified_since_sync();
    }

    /// Records a successful reconciliation with the provider at `now`.
    ///
    /// The sync point never precedes the last modification, so a record
    /// stamped here is never considered modified since sync.
    pub fn mark_synced(&mut self, now: Timestamp) {
        self.last_pushed_at = Some(now.max(self.last_modified_at));
        self.needs_push = false;
    }

    /// Overwrites the content fields with the ones of `other`.
    /// Identity and sync metadata are left untouched.
    pub fn copy_content_from(&mut self, other: &impl Event) {
        self.title = other.title().to_string();
        self.description = other.description().map(str::to_string);
        self.start = other.start();
        self.end = other.end();
        self.is_all_day = other.is_all_day();
        self.location = other.location().map(str::to_string);
        self.recurrence_rule = other.recurrence_rule().map(str::to_string);
    }

    /// Whether the event ended before `cutoff`.
    pub fn ended_before(&self, cutoff: Timestamp) -> bool {
        self.end < cutoff
    }

    /// Duration of the event.
    pub fn duration(&self) -> SignedDuration {
        self.end.duration_since(self.start)
    }
}

impl Event for LocalEvent {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn start(&self) -> Timestamp {
        self.start
    }

    fn end(&self) -> Timestamp {
        self.end
    }

    fn is_all_day(&self) -> bool {
        self.is_all_day
    }

    fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn recurrence_rule(&self) -> Option<&str> {
        self.recurrence_rule.as_deref()
    }
}

/// A snapshot of the provider's view of an event.
///
/// Immutable once fetched; a new fetch produces a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEvent {
    /// The provider identifier of the event.
    pub remote_id: String,

    /// The provider calendar holding the event.
    pub remote_calendar_id: String,

    /// The title of the event.
    pub title: String,

    /// The description of the event, if available.
    #[serde(default)]
    pub description: Option<String>,

    /// The start of the event.
    pub start: Timestamp,

    /// The end of the event.
    pub end: Timestamp,

    /// Whether the event spans whole days.
    #[serde(default)]
    pub is_all_day: bool,

    /// The location of the event, if available.
    #[serde(default)]
    pub location: Option<String>,

    /// The recurrence rule, if available.
    #[serde(default)]
    pub recurrence_rule: Option<String>,
}

impl RemoteEvent {
    /// Builds the snapshot the provider would hold for a local event.
    pub fn from_local(
        remote_id: impl Into<String>,
        remote_calendar_id: impl Into<String>,
        local: &impl Event,
    ) -> Self {
        Self {
            remote_id: remote_id.into(),
            remote_calendar_id: remote_calendar_id.into(),
            title: local.title().to_string(),
            description: local.description().map(str::to_string),
            start: local.start(),
            end: local.end(),
            is_all_day: local.is_all_day(),
            location: local.location().map(str::to_string),
            recurrence_rule: local.recurrence_rule().map(str::to_string),
        }
    }
}

impl Event for RemoteEvent {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn start(&self) -> Timestamp {
        self.start
    }

    fn end(&self) -> Timestamp {
        self.end
    }

    fn is_all_day(&self) -> bool {
        self.is_all_day
    }

    fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn recurrence_rule(&self) -> Option<&str> {
        self.recurrence_rule.as_deref()
    }
}

/// Draft for an event, used for creating new events.
#[derive(Debug, Clone)]
pub struct EventDraft {
    /// The title of the event.
    pub title: String,

    /// The description of the event, if available.
    pub description: Option<String>,

    /// The start of the event.
    pub start: Timestamp,

    /// The end of the event.
    pub end: Timestamp,

    /// Whether the event spans whole days.
    pub is_all_day: bool,

    /// The location of the event, if available.
    pub location: Option<String>,

    /// The recurrence rule, if available.
    pub recurrence_rule: Option<String>,

    /// The provider calendar the event should be synced to.
    pub remote_calendar_id: Option<String>,
}

impl EventDraft {
    /// Creates a one hour draft starting at `start`.
    pub fn new(title: impl Into<String>, start: Timestamp) -> Self {
        Self {
            title: title.into(),
            description: None,
            start,
            end: start + SignedDuration::from_hours(1),
            is_all_day: false,
            location: None,
            recurrence_rule: None,
            remote_calendar_id: None,
        }
    }

    /// Converts the draft into a fresh local record.
    pub(crate) fn into_local(self, id: String, now: Timestamp) -> LocalEvent {
        let mut event = LocalEvent {
            id,
            title: self.title,
            description: self.description,
            start: self.start,
            end: self.end,
            is_all_day: self.is_all_day,
            location: self.location,
            recurrence_rule: self.recurrence_rule,
            remote_id: None,
            remote_calendar_id: self.remote_calendar_id,
            last_pushed_at: None,
            last_modified_at: now,
            needs_push: false,
        };
        event.refresh_needs_push();
        event
    }
}

/// Patch for an event, allowing partial updates.
#[derive(Debug, Default, Clone)]
pub struct EventPatch {
    /// The title of the event, if set.
    pub title: Option<String>,

    /// The description of the event, if set.
    pub description: Option<Option<String>>,

    /// The start of the event, if set.
    pub start: Option<Timestamp>,

    /// The end of the event, if set.
    pub end: Option<Timestamp>,

    /// Whether the event spans whole days, if set.
    pub is_all_day: Option<bool>,

    /// The location of the event, if set.
    pub location: Option<Option<String>>,

    /// The recurrence rule of the event, if set.
    pub recurrence_rule: Option<Option<String>>,
}

impl EventPatch {
    /// Is this patch empty, meaning no fields are set
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.is_all_day.is_none()
            && self.location.is_none()
            && self.recurrence_rule.is_none()
    }

    /// Applies the patch to a local record, stamping it as modified at `now`.
    pub(crate) fn apply_to<'a>(&self, e: &'a mut LocalEvent, now: Timestamp) -> &'a mut LocalEvent {
        if let Some(title) = &self.title {
            e.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            e.description.clone_from(description);
        }
        if let Some(start) = self.start {
            e.start = start;
        }
        if let Some(end) = self.end {
            e.end = end;
        }
        if let Some(is_all_day) = self.is_all_day {
            e.is_all_day = is_all_day;
        }
        if let Some(location) = &self.location {
            e.location.clone_from(location);
        }
        if let Some(rrule) = &self.recurrence_rule {
            e.recurrence_rule.clone_from(rrule);
        }

        e.last_modified_at = now;
        e.refresh_needs_push();
        e
    }
}
