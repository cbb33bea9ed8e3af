// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use jiff::Timestamp;
use tandem_core::{LocalEvent, RemoteEvent};

use crate::RemoteError;

/// Client for a remote calendar provider.
///
/// Timeouts are the adapter's business; the sync engine awaits each call
/// without a deadline of its own.
#[async_trait]
pub trait RemoteCalendarAdapter: Send + Sync {
    /// Lists the events of the given calendars overlapping `[from, to]`.
    async fn list_events(
        &self,
        calendar_ids: &[String],
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<RemoteEvent>, RemoteError>;

    /// Creates an event and returns the identifier assigned by the provider.
    async fn create_event(
        &self,
        calendar_id: &str,
        event: &LocalEvent,
    ) -> Result<String, RemoteError>;

    /// Replaces the remote event with the local content.
    async fn update_event(
        &self,
        calendar_id: &str,
        remote_id: &str,
        event: &LocalEvent,
    ) -> Result<(), RemoteError>;

    /// Whether the client currently holds a valid session.
    async fn is_authenticated(&self) -> bool;
}
