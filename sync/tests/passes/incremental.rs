// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Incremental passes.

use jiff::{SignedDuration, Timestamp};
use tandem_sync::{RemoteError, SyncStatus};

use crate::common::{Harness, MockAdapter, bound_local, mins_ago, remote_event, tomorrow};

#[tokio::test]
async fn incremental_errors_keep_the_previous_status() {
    // Arrange
    let harness = Harness::new([], MockAdapter::new());
    harness.sync.start_full_sync().await.unwrap();
    let last_sync = harness.sync.last_sync_time();
    harness
        .adapter
        .fail_next_list(RemoteError::Network("timeout".to_string()));

    // Act
    let result = harness.sync.start_incremental_sync().await;

    // Assert
    assert!(result.is_err());
    assert!(matches!(harness.sync.status(), SyncStatus::Completed { .. }));
    assert_eq!(harness.sync.last_sync_time(), last_sync);
}

#[tokio::test]
async fn incremental_auth_failure_is_not_surfaced_as_failed() {
    let adapter = MockAdapter::new();
    adapter.set_authenticated(false);
    let harness = Harness::new([], adapter);

    let result = harness.sync.start_incremental_sync().await;

    assert!(result.is_err());
    assert_eq!(harness.sync.status(), SyncStatus::Idle);
}

#[tokio::test]
async fn incremental_window_starts_at_last_sync() {
    // Arrange
    let harness = Harness::new([], MockAdapter::new());
    let before = Timestamp::now();

    // Act
    harness.sync.start_incremental_sync().await.unwrap();
    let first_sync = harness.sync.last_sync_time().unwrap();
    harness.sync.start_incremental_sync().await.unwrap();

    // Assert
    let windows = harness.adapter.list_windows();
    assert_eq!(windows.len(), 2);
    let (first_from, first_to) = windows[0];
    assert!(first_from <= before - SignedDuration::from_mins(59));
    assert!(first_to.duration_since(first_from) < SignedDuration::from_hours(24 * 8));
    assert_eq!(windows[1].0, first_sync);
}

#[tokio::test]
async fn incremental_sync_still_collects_conflicts() {
    // Arrange
    let nine = tomorrow();
    let original = remote_event("r-1", "Standup", nine);
    let local = bound_local("ev-1", &original, mins_ago(20), mins_ago(10));
    let mut renamed = original.clone();
    renamed.title = "Standup (cancelled)".to_string();
    let adapter = MockAdapter::with_events([renamed]);
    adapter.fail_next_update(RemoteError::Network("timeout".to_string()));
    let harness = Harness::new([local], adapter);

    // Act
    let report = harness.sync.start_incremental_sync().await.unwrap().unwrap();

    // Assert
    assert_eq!(report.conflicts_detected, 1);
    assert_eq!(harness.sync.pending_conflicts().len(), 1);
    assert_eq!(harness.sync.status(), SyncStatus::ConflictResolutionRequired);
}
