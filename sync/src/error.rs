// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use tandem_core::StoreError;

/// Errors reported by a remote calendar provider.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Transport failure; retried on the next tick.
    #[error("network error: {0}")]
    Network(String),

    /// The provider rejected our credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider rejected the event data.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The remote event no longer exists.
    #[error("remote event not found: {0}")]
    NotFound(String),
}

impl RemoteError {
    /// Whether the error aborts the whole pass rather than a single event.
    pub fn is_pass_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Errors raised by the sync engine.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A provider call failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The local store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Date arithmetic overflowed.
    #[error("time arithmetic failed: {0}")]
    Time(#[from] jiff::Error),

    /// The provider client has no valid session.
    #[error("remote calendar is not authenticated")]
    NotAuthenticated,

    /// No pending conflict has the given id.
    #[error("conflict not found: {0}")]
    ConflictNotFound(String),

    /// The local event changed after the conflict was detected.
    #[error("conflict {0} is stale, the local event changed since detection")]
    StaleConflict(String),

    /// The event has no calendar to push to.
    #[error("event {0} is not bound to a remote calendar")]
    NoCalendar(String),

    /// The orchestrator task has stopped.
    #[error("sync orchestrator is not running")]
    Closed,
}

impl SyncError {
    /// Whether the error aborts the whole pass rather than a single event.
    pub fn is_pass_fatal(&self) -> bool {
        match self {
            Self::Remote(e) => e.is_pass_fatal(),
            Self::NotAuthenticated | Self::Store(_) | Self::Time(_) | Self::Closed => true,
            Self::ConflictNotFound(_) | Self::StaleConflict(_) | Self::NoCalendar(_) => false,
        }
    }
}
