// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Test data factories for integration tests.

use std::path::Path;

use jiff::Timestamp;
use tandem_core::{Config, EventDraft};

/// Creates a test configuration rooted at the given state directory.
#[must_use]
pub fn test_config(state_dir: &Path) -> Config {
    Config {
        state_dir: Some(state_dir.to_path_buf()),
    }
}

/// A fixed start time used across tests.
#[must_use]
pub fn test_start() -> Timestamp {
    "2026-03-02T09:00:00Z".parse().expect("valid timestamp")
}

/// Creates a local-only event draft with the given title.
#[must_use]
pub fn test_draft(title: &str) -> EventDraft {
    EventDraft::new(title, test_start())
}

/// Creates an event draft bound to the given provider calendar.
#[must_use]
#[allow(dead_code)]
pub fn bound_draft(title: &str, calendar: &str) -> EventDraft {
    let mut draft = test_draft(title);
    draft.remote_calendar_id = Some(calendar.to_string());
    draft
}
