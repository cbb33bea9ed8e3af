// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Bidirectional sync between the local event store and a remote calendar
//! provider.
//!
//! The [`SyncOrchestrator`] runs passes of four phases: push local changes,
//! pull remote events for a date window, retry automatic resolution of
//! pending conflicts, then purge old sync metadata and persist. Divergent
//! events are classified by the [`ConflictDetector`], settled by the
//! [`ResolutionPolicy`] when possible and applied by the [`Reconciler`].

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

mod adapter;
mod config;
mod conflict;
mod error;
mod orchestrator;
mod policy;
mod reconciler;
mod scheduler;
mod status;
mod window;

pub use crate::adapter::RemoteCalendarAdapter;
pub use crate::config::{
    DEFAULT_FULL_INTERVAL, DEFAULT_REALTIME_INTERVAL, DEFAULT_RECENCY_WINDOW, DEFAULT_RETENTION,
    DEFAULT_START_TOLERANCE, SyncConfig, load_config,
};
pub use crate::conflict::{ConflictDetector, ConflictType, Resolution, SyncConflict};
pub use crate::error::{RemoteError, SyncError};
pub use crate::orchestrator::{PassResult, SyncOrchestrator};
pub use crate::policy::ResolutionPolicy;
pub use crate::reconciler::{PullOutcome, Reconciler};
pub use crate::status::{PassReport, SyncKind, SyncState, SyncStatus};
pub use crate::window::SyncWindow;
