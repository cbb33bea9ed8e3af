// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use crate::LocalEvent;

pub use memory::MemoryStore;

/// Errors raised by local event stores.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The SQLite backend failed.
    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Reading or writing a snapshot file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot file could not be encoded or decoded.
    #[error("invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// No event exists with the given id.
    #[error("event not found: {0}")]
    NotFound(String),

    /// A stored value could not be decoded.
    #[error("invalid stored value: {0}")]
    Invalid(String),
}

/// Persistent storage for local events.
///
/// Implementations must be safe to share between tasks. Callers that need a
/// consistent read-modify-write go through [`SharedStore`].
#[async_trait]
pub trait LocalEventStore: Send + Sync {
    /// Returns every stored event.
    async fn all_events(&self) -> Result<Vec<LocalEvent>, StoreError>;

    /// Returns the event with the given id, if any.
    async fn get(&self, id: &str) -> Result<Option<LocalEvent>, StoreError>;

    /// Returns the event bound to the given provider id, if any.
    async fn find_by_remote_id(&self, remote_id: &str) -> Result<Option<LocalEvent>, StoreError>;

    /// Inserts the event or replaces the stored one with the same id.
    async fn upsert(&self, event: &LocalEvent) -> Result<(), StoreError>;

    /// Flushes pending writes to durable storage.
    async fn persist(&self) -> Result<(), StoreError>;
}

/// A store shared by user edits and the sync engine.
///
/// Every read-modify-write holds the same lock, so an edit can never land
/// between a sync decision and the write that applies it.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<Box<dyn LocalEventStore>>>,
}

impl SharedStore {
    /// Wraps a store for shared use.
    pub fn new(store: impl LocalEventStore + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(store))),
        }
    }

    /// Acquires the store lock.
    pub async fn lock(&self) -> MutexGuard<'_, Box<dyn LocalEventStore>> {
        self.inner.lock().await
    }

    /// Returns every stored event.
    pub async fn all_events(&self) -> Result<Vec<LocalEvent>, StoreError> {
        self.lock().await.all_events().await
    }

    /// Returns the event with the given id, if any.
    pub async fn get(&self, id: &str) -> Result<Option<LocalEvent>, StoreError> {
        self.lock().await.get(id).await
    }

    /// Flushes pending writes to durable storage.
    pub async fn persist(&self) -> Result<(), StoreError> {
        self.lock().await.persist().await
    }
}

impl fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStore").finish_non_exhaustive()
    }
}
