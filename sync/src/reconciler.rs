// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::Arc;

use jiff::Timestamp;
use tandem_core::{LocalEvent, LocalEventStore, RemoteEvent, SharedStore, StoreError};
use uuid::Uuid;

use crate::conflict::{ConflictDetector, Resolution, SyncConflict};
use crate::{RemoteCalendarAdapter, RemoteError, SyncError};

/// What a pull did with one remote snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// No local event was bound to the remote one; a new one was created.
    Created(LocalEvent),

    /// The bound local event absorbed the remote content.
    Updated(LocalEvent),

    /// The bound local event diverges; nothing was written.
    Conflict(SyncConflict),
}

/// Applies sync decisions to the local store and the remote provider.
///
/// Every operation holds the [`SharedStore`] lock from the read of the
/// current record to the final write, including the provider call in
/// between, so a user edit cannot land in the middle.
#[derive(Clone)]
pub struct Reconciler {
    store: SharedStore,
    adapter: Arc<dyn RemoteCalendarAdapter>,
    detector: ConflictDetector,
    default_calendar: Option<String>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &self.store)
            .field("detector", &self.detector)
            .field("default_calendar", &self.default_calendar)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a reconciler over the given store and provider.
    pub fn new(
        store: SharedStore,
        adapter: Arc<dyn RemoteCalendarAdapter>,
        detector: ConflictDetector,
    ) -> Self {
        Self {
            store,
            adapter,
            detector,
            default_calendar: None,
        }
    }

    /// Sets the calendar that local-only events are created in when pushed.
    #[must_use]
    pub fn with_default_calendar(mut self, calendar: Option<String>) -> Self {
        self.default_calendar = calendar;
        self
    }

    /// The store this reconciler writes to.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Pushes the current version of a local event and returns its remote id.
    ///
    /// Unbound events are created, bound ones updated. On success the record
    /// is stamped as synced at `now`. On failure it keeps `needs_push`; a
    /// [`RemoteError::NotFound`] additionally drops the stale remote id so
    /// the next push recreates the event.
    pub async fn push(&self, id: &str, now: Timestamp) -> Result<String, SyncError> {
        let store = self.store.lock().await;
        let event = store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        self.push_locked(&**store, event, now).await
    }

    /// Reconciles one remote snapshot with the local store.
    pub async fn pull(&self, remote: &RemoteEvent, now: Timestamp) -> Result<PullOutcome, SyncError> {
        let store = self.store.lock().await;

        let Some(mut local) = store.find_by_remote_id(&remote.remote_id).await? else {
            let event = LocalEvent::from_remote(Uuid::new_v4().to_string(), remote, now);
            store.upsert(&event).await?;
            tracing::debug!(id = %event.id, remote_id = %remote.remote_id, "created local event from remote");
            return Ok(PullOutcome::Created(event));
        };

        if let Some(conflict) = self.detector.detect(&local, remote) {
            return Ok(PullOutcome::Conflict(conflict));
        }

        local.copy_content_from(remote);
        local.remote_calendar_id = Some(remote.remote_calendar_id.clone());
        local.mark_synced(now);
        store.upsert(&local).await?;
        tracing::debug!(id = %local.id, remote_id = %remote.remote_id, "absorbed remote event");
        Ok(PullOutcome::Updated(local))
    }

    /// Settles a conflict with the given resolution.
    ///
    /// Fails with [`SyncError::StaleConflict`] when the local event was
    /// modified or unbound after the conflict was detected.
    pub async fn apply(
        &self,
        conflict: &SyncConflict,
        resolution: Resolution,
        now: Timestamp,
    ) -> Result<(), SyncError> {
        if resolution == Resolution::Skip {
            tracing::debug!(conflict = %conflict.id, "skipped conflict");
            return Ok(());
        }

        let store = self.store.lock().await;
        let mut current = store
            .get(&conflict.local.id)
            .await?
            .ok_or_else(|| StoreError::NotFound(conflict.local.id.clone()))?;

        if current.last_modified_at != conflict.local.last_modified_at
            || current.remote_id != conflict.local.remote_id
        {
            return Err(SyncError::StaleConflict(conflict.id.clone()));
        }

        tracing::debug!(conflict = %conflict.id, id = %current.id, ?resolution, "applying resolution");
        match resolution {
            Resolution::UseLocal => {
                self.push_locked(&**store, current, now).await?;
            }
            Resolution::UseRemote => {
                current.copy_content_from(&conflict.remote);
                current.mark_synced(now);
                store.upsert(&current).await?;
            }
            Resolution::Merge => {
                let before = current.clone();
                current.description.clone_from(&conflict.remote.description);
                current.last_modified_at = now.max(current.last_modified_at);
                current.refresh_needs_push();
                // Kept on per-event push failures, so the next pass pushes
                // the merge.
                store.upsert(&current).await?;
                if let Err(e) = self.push_locked(&**store, current, now).await {
                    if e.is_pass_fatal() {
                        // The conflict stays pending and must still match.
                        store.upsert(&before).await?;
                    }
                    return Err(e);
                }
            }
            Resolution::Skip => {}
        }

        Ok(())
    }

    async fn push_locked(
        &self,
        store: &dyn LocalEventStore,
        mut event: LocalEvent,
        now: Timestamp,
    ) -> Result<String, SyncError> {
        let calendar = event
            .remote_calendar_id
            .clone()
            .or_else(|| self.default_calendar.clone())
            .ok_or_else(|| SyncError::NoCalendar(event.id.clone()))?;

        let remote_id = match event.remote_id.clone() {
            None => {
                let remote_id = self.adapter.create_event(&calendar, &event).await?;
                tracing::debug!(id = %event.id, %remote_id, %calendar, "created remote event");
                remote_id
            }
            Some(remote_id) => match self.adapter.update_event(&calendar, &remote_id, &event).await {
                Ok(()) => {
                    tracing::debug!(id = %event.id, %remote_id, "updated remote event");
                    remote_id
                }
                Err(RemoteError::NotFound(e)) => {
                    tracing::warn!(id = %event.id, %remote_id, "remote event vanished, unbinding");
                    event.remote_id = None;
                    event.remote_calendar_id = Some(calendar);
                    event.needs_push = true;
                    store.upsert(&event).await?;
                    return Err(RemoteError::NotFound(e).into());
                }
                Err(e) => return Err(e.into()),
            },
        };

        event.remote_id = Some(remote_id.clone());
        event.remote_calendar_id = Some(calendar);
        event.mark_synced(now);
        store.upsert(&event).await?;
        Ok(remote_id)
    }
}
