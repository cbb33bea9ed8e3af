// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Test data factories for sync tests.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use tandem_core::{LocalEvent, MemoryStore, RemoteEvent, SharedStore};
use tandem_sync::{SyncConfig, SyncOrchestrator};

use crate::common::MockAdapter;

pub const CALENDAR: &str = "primary";

/// A time `mins` minutes before now.
#[must_use]
pub fn mins_ago(mins: i64) -> Timestamp {
    Timestamp::now() - SignedDuration::from_mins(mins)
}

/// Tomorrow, well inside every sync window.
#[must_use]
pub fn tomorrow() -> Timestamp {
    Timestamp::now() + SignedDuration::from_hours(24)
}

/// A half-hour remote event in the test calendar.
#[must_use]
pub fn remote_event(remote_id: &str, title: &str, start: Timestamp) -> RemoteEvent {
    RemoteEvent {
        remote_id: remote_id.to_string(),
        remote_calendar_id: CALENDAR.to_string(),
        title: title.to_string(),
        description: None,
        start,
        end: start + SignedDuration::from_mins(30),
        is_all_day: false,
        location: None,
        recurrence_rule: None,
    }
}

/// A local copy of `remote`, last synced at `pushed_at` and last edited at
/// `modified_at`.
#[must_use]
pub fn bound_local(
    id: &str,
    remote: &RemoteEvent,
    pushed_at: Timestamp,
    modified_at: Timestamp,
) -> LocalEvent {
    let mut event = LocalEvent::from_remote(id.to_string(), remote, pushed_at);
    event.last_modified_at = modified_at;
    event.refresh_needs_push();
    event
}

/// A never-pushed local event waiting to be created in the test calendar.
#[must_use]
pub fn unpushed_local(id: &str, title: &str, start: Timestamp) -> LocalEvent {
    let mut event = LocalEvent::from_remote(id.to_string(), &remote_event("", title, start), start);
    event.remote_id = None;
    event.last_pushed_at = None;
    event.last_modified_at = Timestamp::now();
    event.refresh_needs_push();
    event
}

/// Sync configuration pulling from the test calendar.
#[must_use]
pub fn test_config() -> SyncConfig {
    SyncConfig {
        calendars: vec![CALENDAR.to_string()],
        default_calendar: Some(CALENDAR.to_string()),
        ..SyncConfig::default()
    }
}

/// Orchestrator under test with the store and provider it drives.
#[derive(Debug)]
pub struct Harness {
    pub sync: SyncOrchestrator,
    pub store: SharedStore,
    pub adapter: Arc<MockAdapter>,
}

impl Harness {
    /// Spawns an orchestrator over a memory store seeded with `events`.
    pub fn new(events: impl IntoIterator<Item = LocalEvent>, adapter: MockAdapter) -> Self {
        Self::with_config(events, adapter, test_config())
    }

    pub fn with_config(
        events: impl IntoIterator<Item = LocalEvent>,
        adapter: MockAdapter,
        config: SyncConfig,
    ) -> Self {
        let store = SharedStore::new(MemoryStore::with_events(events));
        let adapter = Arc::new(adapter);
        let sync = SyncOrchestrator::spawn(store.clone(), adapter.clone(), config);
        Self {
            sync,
            store,
            adapter,
        }
    }

    pub async fn local(&self, id: &str) -> LocalEvent {
        self.store.get(id).await.unwrap().expect("local event missing")
    }

    pub async fn put_local(&self, event: &LocalEvent) {
        self.store.lock().await.upsert(event).await.unwrap();
    }

    pub async fn local_count(&self) -> usize {
        self.store.all_events().await.unwrap().len()
    }
}
