// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use jiff::{SignedDuration, Timestamp};

use crate::config::DEFAULT_RECENCY_WINDOW;
use crate::conflict::{ConflictType, Resolution, SyncConflict};

/// Decides which conflicts can be settled without asking the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionPolicy {
    recency_window: SignedDuration,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RECENCY_WINDOW)
    }
}

impl ResolutionPolicy {
    /// Creates a policy protecting local edits younger than `recency_window`.
    pub fn new(recency_window: SignedDuration) -> Self {
        Self { recency_window }
    }

    /// Picks a resolution for `conflict`, or `None` if a human has to decide.
    ///
    /// Recent local edits win. Otherwise description-only drift takes the
    /// remote copy; anything else is left for manual resolution.
    pub fn auto_resolve(&self, conflict: &SyncConflict, now: Timestamp) -> Option<Resolution> {
        let age = now.duration_since(conflict.local.last_modified_at);
        if age < self.recency_window {
            return Some(Resolution::UseLocal);
        }

        match conflict.kind {
            ConflictType::DescriptionMismatch => Some(Resolution::UseRemote),
            ConflictType::TitleMismatch
            | ConflictType::DateMismatch
            | ConflictType::LocationMismatch
            | ConflictType::MultipleDifferences => None,
        }
    }
}
