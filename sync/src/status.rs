// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::mem;
use std::sync::Arc;

use jiff::Timestamp;

use crate::SyncError;
use crate::conflict::SyncConflict;

/// The state of the orchestrator.
///
/// Equality compares the variant only, so `Failed` statuses with different
/// errors are equal and so are two `Syncing` statuses at different progress.
#[derive(Debug, Clone, Default)]
pub enum SyncStatus {
    /// No pass has run yet.
    #[default]
    Idle,

    /// A pass is in flight.
    Syncing {
        /// Fraction of the pass completed, in `0.0..=1.0`.
        progress: f32,
    },

    /// The last pass finished with no pending conflicts.
    Completed {
        /// When the pass finished.
        at: Timestamp,
    },

    /// The last full pass aborted.
    Failed {
        /// The error that aborted the pass.
        error: Arc<SyncError>,
    },

    /// Conflicts are waiting for a user decision.
    ConflictResolutionRequired,
}

impl SyncStatus {
    /// Progress of the current pass, `1.0` outside of a pass once one ran.
    pub fn progress(&self) -> f32 {
        match self {
            Self::Idle => 0.0,
            Self::Syncing { progress } => *progress,
            Self::Completed { .. } | Self::Failed { .. } | Self::ConflictResolutionRequired => 1.0,
        }
    }

    /// Whether a pass is in flight.
    pub fn is_syncing(&self) -> bool {
        matches!(self, Self::Syncing { .. })
    }
}

impl PartialEq for SyncStatus {
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

impl Eq for SyncStatus {}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Syncing { progress } => write!(f, "syncing ({:.0}%)", progress * 100.0),
            Self::Completed { at } => write!(f, "completed at {at}"),
            Self::Failed { error } => write!(f, "failed: {error}"),
            Self::ConflictResolutionRequired => f.write_str("conflict resolution required"),
        }
    }
}

/// Which schedule a pass belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    /// Wide window; errors move the orchestrator to `Failed`.
    Full,

    /// Narrow window; errors are logged and swallowed.
    Incremental,
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Incremental => f.write_str("incremental"),
        }
    }
}

/// Snapshot of the orchestrator's observable state.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    /// Current status.
    pub status: SyncStatus,

    /// Conflicts waiting for a user decision, in discovery order.
    pub pending_conflicts: Vec<SyncConflict>,

    /// When the last pass completed.
    pub last_sync_time: Option<Timestamp>,

    /// Whether the short timer is active.
    pub real_time: bool,
}

impl SyncState {
    /// Progress of the current pass.
    pub fn progress(&self) -> f32 {
        self.status.progress()
    }
}

/// Counters collected during one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Events pushed to the provider in phase (a).
    pub pushed: usize,

    /// Events whose push failed in phase (a).
    pub push_failures: usize,

    /// Remote events listed in phase (b).
    pub pulled: usize,

    /// Local events created from unknown remote events.
    pub created: usize,

    /// Conflicts detected in phase (b).
    pub conflicts_detected: usize,

    /// Conflicts settled by the policy, in phase (b) or (c).
    pub auto_resolved: usize,

    /// Events whose sync metadata was purged in phase (d).
    pub purged: usize,
}
