// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;

use crate::LocalEvent;
use crate::store::{LocalEventStore, StoreError};

/// An in-memory event store, optionally backed by a JSON snapshot file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: RwLock<BTreeMap<String, LocalEvent>>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// Creates an empty store that never touches the disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the given events.
    pub fn with_events(events: impl IntoIterator<Item = LocalEvent>) -> Self {
        let events = events.into_iter().map(|e| (e.id.clone(), e)).collect();
        Self {
            events: RwLock::new(events),
            snapshot: None,
        }
    }

    /// Loads the store from a snapshot file.
    ///
    /// If the file does not exist, an empty store is returned and the file is
    /// created on the first [`persist`](LocalEventStore::persist).
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let events = match fs::read_to_string(&path).await {
            Ok(content) => {
                let events: Vec<LocalEvent> = serde_json::from_str(&content)?;
                tracing::debug!(path = %path.display(), count = events.len(), "loaded event snapshot");
                events.into_iter().map(|e| (e.id.clone(), e)).collect()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no event snapshot yet, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            events: RwLock::new(events),
            snapshot: Some(path),
        })
    }
}

#[async_trait]
impl LocalEventStore for MemoryStore {
    async fn all_events(&self) -> Result<Vec<LocalEvent>, StoreError> {
        Ok(self.events.read().await.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<LocalEvent>, StoreError> {
        Ok(self.events.read().await.get(id).cloned())
    }

    async fn find_by_remote_id(&self, remote_id: &str) -> Result<Option<LocalEvent>, StoreError> {
        let events = self.events.read().await;
        Ok(events
            .values()
            .find(|e| e.remote_id.as_deref() == Some(remote_id))
            .cloned())
    }

    async fn upsert(&self, event: &LocalEvent) -> Result<(), StoreError> {
        self.events
            .write()
            .await
            .insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        let content = {
            let events = self.events.read().await;
            serde_json::to_string_pretty(&events.values().collect::<Vec<_>>())?
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;
        tracing::debug!(path = %path.display(), "wrote event snapshot");
        Ok(())
    }
}
