// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use jiff::Timestamp;
use tokio::fs;
use uuid::Uuid;

use crate::localdb::SqliteStore;
use crate::store::{SharedStore, StoreError};
use crate::{Config, EventDraft, EventPatch, LocalEvent};

/// Task and calendar manager core.
///
/// All edits go through the [`SharedStore`] lock, the same one the sync
/// engine takes, so user changes and reconciliation never interleave.
#[derive(Debug, Clone)]
pub struct Tandem {
    config: Config,
    store: SharedStore,
}

impl Tandem {
    /// Creates a new instance backed by the SQLite database in the state
    /// directory.
    pub async fn new(mut config: Config) -> Result<Self, Box<dyn Error>> {
        config.normalize()?;
        prepare(&config).await?;

        let db_path = config.database_path();
        let store = SqliteStore::open(db_path.as_deref())
            .await
            .map_err(|e| format!("Failed to initialize db: {e}"))?;

        Ok(Self {
            config,
            store: SharedStore::new(store),
        })
    }

    /// Creates a new instance on top of an existing store.
    pub fn with_store(config: Config, store: SharedStore) -> Self {
        Self { config, store }
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The store shared with the sync engine.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Add a new event from the given draft.
    pub async fn new_event(&self, draft: EventDraft) -> Result<LocalEvent, StoreError> {
        let store = self.store.lock().await;
        let id = generate_id(&**store).await?;
        let event = draft.into_local(id, Timestamp::now());
        store.upsert(&event).await?;

        tracing::debug!(id = %event.id, needs_push = event.needs_push, "created event");
        Ok(event)
    }

    /// Update an event with the given patch.
    pub async fn update_event(&self, id: &str, patch: EventPatch) -> Result<LocalEvent, StoreError> {
        let store = self.store.lock().await;
        let Some(mut event) = store.get(id).await? else {
            return Err(StoreError::NotFound(id.to_string()));
        };

        if patch.is_empty() {
            return Ok(event);
        }

        patch.apply_to(&mut event, Timestamp::now());
        store.upsert(&event).await?;

        tracing::debug!(id, needs_push = event.needs_push, "updated event");
        Ok(event)
    }

    /// Get an event by its id.
    pub async fn get_event(&self, id: &str) -> Result<LocalEvent, StoreError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// List all events, ordered by start.
    pub async fn list_events(&self) -> Result<Vec<LocalEvent>, StoreError> {
        let mut events = self.store.all_events().await?;
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    /// Close the instance, flushing pending writes.
    pub async fn close(self) -> Result<(), StoreError> {
        self.store.persist().await
    }
}

async fn prepare(config: &Config) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = &config.state_dir {
        tracing::debug!(path = %parent.display(), "ensuring state directory exists");
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

async fn generate_id(store: &dyn crate::LocalEventStore) -> Result<String, StoreError> {
    for _ in 0..16 {
        let id = Uuid::new_v4().to_string();
        if store.get(&id).await?.is_none() {
            return Ok(id);
        }
    }

    Err(StoreError::Invalid(
        "failed to generate a unique id after multiple attempts".to_string(),
    ))
}
