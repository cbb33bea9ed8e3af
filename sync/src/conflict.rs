// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};
use tandem_core::{Event, LocalEvent, RemoteEvent};
use uuid::Uuid;

use crate::config::DEFAULT_START_TOLERANCE;

/// Classification of a divergence between the local and the remote copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictType {
    /// Only the title differs.
    TitleMismatch,

    /// Only the start time differs, beyond the tolerance.
    DateMismatch,

    /// Only the description differs.
    DescriptionMismatch,

    /// Only the location differs.
    LocationMismatch,

    /// More than one field differs.
    MultipleDifferences,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TitleMismatch => "title mismatch",
            Self::DateMismatch => "date mismatch",
            Self::DescriptionMismatch => "description mismatch",
            Self::LocationMismatch => "location mismatch",
            Self::MultipleDifferences => "multiple differences",
        };
        f.write_str(s)
    }
}

/// How a conflict is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// Keep the local copy and push it.
    UseLocal,

    /// Overwrite the local copy with the remote snapshot.
    UseRemote,

    /// Keep title, time and location from local, take the description from
    /// remote, and push the result.
    Merge,

    /// Leave both sides alone until the next pass.
    Skip,
}

/// One detected divergence between a local event and its remote snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Generated per detection; not stable across passes.
    pub id: String,

    /// The local record at detection time.
    pub local: LocalEvent,

    /// The remote snapshot at detection time.
    pub remote: RemoteEvent,

    /// The classification of the divergence.
    pub kind: ConflictType,

    /// The resolution chosen for this conflict, once known.
    pub resolution: Option<Resolution>,
}

impl SyncConflict {
    /// Creates an unresolved conflict with a fresh id.
    pub fn new(local: LocalEvent, remote: RemoteEvent, kind: ConflictType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            local,
            remote,
            kind,
            resolution: None,
        }
    }
}

/// Decides whether a local event and its remote snapshot materially diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictDetector {
    start_tolerance: SignedDuration,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(DEFAULT_START_TOLERANCE)
    }
}

impl ConflictDetector {
    /// Creates a detector treating start times up to `start_tolerance` apart
    /// as equal.
    pub fn new(start_tolerance: SignedDuration) -> Self {
        Self {
            start_tolerance: start_tolerance.abs(),
        }
    }

    /// Compares a local event with the remote snapshot of the same provider
    /// event.
    ///
    /// Returns `None` unless the local copy was edited after its last sync
    /// point and at least one compared field differs. A local event that was
    /// never synced has no authorship to protect, so it never conflicts.
    pub fn detect(&self, local: &LocalEvent, remote: &RemoteEvent) -> Option<SyncConflict> {
        if local.remote_id.as_deref() != Some(remote.remote_id.as_str()) {
            tracing::warn!(
                id = %local.id,
                remote_id = %remote.remote_id,
                "detector called on events that are not bound to each other"
            );
            return None;
        }

        let pushed = local.last_pushed_at?;
        if local.last_modified_at <= pushed {
            return None;
        }

        let kind = self.classify(local, remote)?;
        tracing::debug!(id = %local.id, remote_id = %remote.remote_id, %kind, "conflict detected");
        Some(SyncConflict::new(local.clone(), remote.clone(), kind))
    }

    /// Classifies the differing fields, or `None` if the content matches.
    pub fn classify(&self, local: &impl Event, remote: &impl Event) -> Option<ConflictType> {
        let start_delta = local.start().duration_since(remote.start()).abs();
        let differences = [
            (local.title() != remote.title(), ConflictType::TitleMismatch),
            (start_delta > self.start_tolerance, ConflictType::DateMismatch),
            (
                !text_eq(local.description(), remote.description()),
                ConflictType::DescriptionMismatch,
            ),
            (
                !text_eq(local.location(), remote.location()),
                ConflictType::LocationMismatch,
            ),
        ];

        let mut differing = differences
            .into_iter()
            .filter_map(|(differs, kind)| differs.then_some(kind));

        let first = differing.next()?;
        match differing.next() {
            Some(_) => Some(ConflictType::MultipleDifferences),
            None => Some(first),
        }
    }
}

/// Absent and empty text compare equal.
fn text_eq(a: Option<&str>, b: Option<&str>) -> bool {
    a.unwrap_or_default() == b.unwrap_or_default()
}
