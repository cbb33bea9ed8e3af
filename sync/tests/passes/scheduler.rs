// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Timer-driven passes, on a paused clock.

use std::time::Duration;

use jiff::SignedDuration;
use tokio::time::{sleep, timeout};

use crate::common::{Harness, MockAdapter, remote_event, tomorrow};

/// Waits until a pass has completed, failing the test after `limit`.
async fn wait_for_sync(harness: &Harness, limit: Duration) {
    let mut state = harness.sync.subscribe();
    timeout(limit, state.wait_for(|s| s.last_sync_time.is_some()))
        .await
        .expect("no sync pass within the time limit")
        .expect("orchestrator stopped");
}

#[tokio::test(start_paused = true)]
async fn full_timer_fires_after_fifteen_minutes() {
    let harness = Harness::new(
        [],
        MockAdapter::with_events([remote_event("r-1", "Standup", tomorrow())]),
    );

    sleep(Duration::from_secs(14 * 60)).await;
    let before_tick = harness.adapter.count_lists();
    wait_for_sync(&harness, Duration::from_secs(2 * 60)).await;

    assert_eq!(before_tick, 0);
    assert_eq!(harness.adapter.count_lists(), 1);
    let (from, to) = harness.adapter.list_windows()[0];
    assert!(to.duration_since(from) > SignedDuration::from_hours(24 * 200));
}

#[tokio::test(start_paused = true)]
async fn real_time_mode_runs_incremental_passes_on_the_short_timer() {
    // Arrange
    let harness = Harness::new([], MockAdapter::new());

    // Act
    harness.sync.enable_real_time().await.unwrap();
    wait_for_sync(&harness, Duration::from_secs(45)).await;
    sleep(Duration::from_secs(60)).await;

    // Assert
    assert!(harness.sync.state().real_time);
    let windows = harness.adapter.list_windows();
    assert!(windows.len() >= 2);
    for (from, to) in windows {
        assert!(to.duration_since(from) < SignedDuration::from_hours(24 * 8));
    }
}

#[tokio::test(start_paused = true)]
async fn disabling_real_time_stops_the_short_timer() {
    // Arrange
    let harness = Harness::new([], MockAdapter::new());
    harness.sync.enable_real_time().await.unwrap();
    wait_for_sync(&harness, Duration::from_secs(45)).await;

    // Act
    harness.sync.disable_real_time().await.unwrap();
    let lists = harness.adapter.count_lists();
    sleep(Duration::from_secs(5 * 60)).await;

    // Assert
    assert!(!harness.sync.state().real_time);
    assert_eq!(harness.adapter.count_lists(), lists);
}

#[tokio::test(start_paused = true)]
async fn ticks_during_a_pass_are_dropped() {
    // Arrange
    let harness = Harness::new([], MockAdapter::new());
    harness.adapter.hold_lists();
    harness.sync.enable_real_time().await.unwrap();
    timeout(Duration::from_secs(45), harness.adapter.list_started.notified())
        .await
        .expect("no scheduled pass started");

    // Act
    sleep(Duration::from_secs(2 * 60)).await;
    harness.adapter.release_lists();
    wait_for_sync(&harness, Duration::from_secs(1)).await;

    // Assert
    assert_eq!(harness.adapter.count_lists(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_timers() {
    let harness = Harness::new([], MockAdapter::new());
    harness.sync.enable_real_time().await.unwrap();

    harness.sync.shutdown().await.unwrap();
    sleep(Duration::from_secs(20 * 60)).await;

    assert_eq!(harness.adapter.count_lists(), 0);
}
