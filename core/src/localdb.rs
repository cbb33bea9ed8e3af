// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

mod events;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::LocalEvent;
use crate::localdb::events::{EventRecord, Events};
use crate::store::{LocalEventStore, StoreError};

/// Gives every in-memory database its own shared-cache name, so all pool
/// connections see the same data while separate stores stay isolated.
static IN_MEMORY_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// SQLite-backed event store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,

    events: Events,
}

impl SqliteStore {
    /// Opens a sqlite database connection.
    /// If `filename` is `None`, it opens an in-memory database.
    #[tracing::instrument]
    pub async fn open(filename: Option<&Path>) -> Result<Self, StoreError> {
        let options = if let Some(filename) = filename {
            tracing::info!(path = %filename.display(), "connecting to SQLite database");
            SqliteConnectOptions::new()
                .filename(filename)
                .journal_mode(SqliteJournalMode::Wal)
                .create_if_missing(true)
        } else {
            let db_id = IN_MEMORY_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
            tracing::info!(db_id, "connecting to in-memory SQLite database");
            SqliteConnectOptions::new()
                .filename(format!("file:tandem_mem_{db_id}?mode=memory&cache=shared"))
                .in_memory(true)
                .shared_cache(true)
                .create_if_missing(true)
        };

        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        sqlx::migrate!("src/localdb/migrations") // relative path from the crate root
            .run(&pool)
            .await?;

        tracing::debug!("database schema is up to date");
        let events = Events::new(pool.clone());
        Ok(Self { pool, events })
    }

    /// Counts the events waiting to be pushed.
    pub async fn count_pending_push(&self) -> Result<i64, StoreError> {
        Ok(self.events.count_pending_push().await?)
    }

    /// Closes the connection pool.
    pub async fn close(self) {
        tracing::debug!("closing database connection");
        self.pool.close().await;
    }
}

#[async_trait]
impl LocalEventStore for SqliteStore {
    async fn all_events(&self) -> Result<Vec<LocalEvent>, StoreError> {
        self.events
            .list()
            .await?
            .into_iter()
            .map(EventRecord::into_event)
            .collect()
    }

    async fn get(&self, id: &str) -> Result<Option<LocalEvent>, StoreError> {
        self.events.get(id).await?.map(EventRecord::into_event).transpose()
    }

    async fn find_by_remote_id(&self, remote_id: &str) -> Result<Option<LocalEvent>, StoreError> {
        self.events
            .get_by_remote_id(remote_id)
            .await?
            .map(EventRecord::into_event)
            .transpose()
    }

    async fn upsert(&self, event: &LocalEvent) -> Result<(), StoreError> {
        self.events.upsert(&EventRecord::from_event(event)).await?;
        Ok(())
    }

    async fn persist(&self) -> Result<(), StoreError> {
        // Writes are durable on commit; fold the WAL back into the main file.
        sqlx::query("PRAGMA wal_checkpoint(PASSIVE);")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
