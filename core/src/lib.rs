// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Core types of Tandem: the event model, local storage and user edits.

mod config;
mod event;
mod localdb;
mod store;
mod tandem;

pub use crate::config::{
    APP_NAME, Config, ConfigDuration, expand_path, get_config_dir, parse_duration,
};
pub use crate::event::{Event, EventDraft, EventPatch, LocalEvent, RemoteEvent};
pub use crate::localdb::SqliteStore;
pub use crate::store::{LocalEventStore, MemoryStore, SharedStore, StoreError};
pub use crate::tandem::Tandem;
