// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Persistence workflow tests.
//!
//! These tests validate that events and their sync metadata survive closing
//! and reopening both store implementations.

use jiff::Timestamp;
use tandem_core::{LocalEventStore, MemoryStore, SharedStore, SqliteStore, Tandem};

use crate::common::{bound_draft, setup_temp_dirs, test_config, test_draft};

#[tokio::test]
async fn persistence_sqlite_reopen_keeps_events() {
    // Arrange
    let temp_dirs = setup_temp_dirs().await.unwrap();
    let config = test_config(&temp_dirs.state_dir);
    let tandem = Tandem::new(config.clone()).await.unwrap();
    let first = tandem.new_event(test_draft("First")).await.unwrap();
    let second = tandem
        .new_event(bound_draft("Second", "primary"))
        .await
        .unwrap();

    // Act
    tandem.close().await.unwrap();
    let reopened = Tandem::new(config).await.unwrap();

    // Assert
    assert!(temp_dirs.state_dir.join("tandem.db").exists());
    assert_eq!(reopened.get_event(&first.id).await.unwrap(), first);
    assert_eq!(reopened.get_event(&second.id).await.unwrap(), second);
}

#[tokio::test]
async fn persistence_sqlite_keeps_sync_metadata() {
    let temp_dirs = setup_temp_dirs().await.unwrap();
    let path = temp_dirs.state_dir.join("events.db");
    let store = SqliteStore::open(Some(&path)).await.unwrap();
    let tandem = Tandem::with_store(test_config(&temp_dirs.state_dir), SharedStore::new(store));

    let mut event = tandem
        .new_event(bound_draft("Planning", "work"))
        .await
        .unwrap();
    event.remote_id = Some("remote-42".to_string());
    event.mark_synced(Timestamp::now());
    tandem.store().lock().await.upsert(&event).await.unwrap();
    tandem.close().await.unwrap();

    let reopened = SqliteStore::open(Some(&path)).await.unwrap();
    assert_eq!(reopened.count_pending_push().await.unwrap(), 0);
    let stored = reopened.get(&event.id).await.unwrap().unwrap();
    assert_eq!(stored.remote_id.as_deref(), Some("remote-42"));
    assert_eq!(stored.last_pushed_at, event.last_pushed_at);
}

#[tokio::test]
async fn persistence_memory_snapshot_written_on_close() {
    let temp_dirs = setup_temp_dirs().await.unwrap();
    let path = temp_dirs.state_dir.join("events.json");
    let store = MemoryStore::open(&path).await.unwrap();
    let tandem = Tandem::with_store(test_config(&temp_dirs.state_dir), SharedStore::new(store));

    let event = tandem.new_event(test_draft("Snapshot")).await.unwrap();
    tandem.close().await.unwrap();

    let reopened = MemoryStore::open(&path).await.unwrap();
    assert_eq!(reopened.get(&event.id).await.unwrap(), Some(event));
}
