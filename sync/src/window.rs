// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use jiff::tz::TimeZone;
use jiff::{SignedDuration, Timestamp, ToSpan};

/// The date range listed from the provider during a pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    /// Inclusive start of the window.
    pub from: Timestamp,

    /// Inclusive end of the window.
    pub to: Timestamp,
}

impl SyncWindow {
    /// One month back to six months ahead of `now`, in calendar months.
    pub fn full(now: Timestamp) -> Result<Self, jiff::Error> {
        let zoned = now.to_zoned(TimeZone::UTC);
        Ok(Self {
            from: zoned.checked_sub(1.month())?.timestamp(),
            to: zoned.checked_add(6.months())?.timestamp(),
        })
    }

    /// From the last sync (or one hour back) to seven days ahead of `now`.
    pub fn incremental(now: Timestamp, last_sync: Option<Timestamp>) -> Result<Self, jiff::Error> {
        let from = match last_sync {
            Some(at) => at,
            None => now.checked_sub(SignedDuration::from_hours(1))?,
        };
        Ok(Self {
            from,
            to: now.checked_add(SignedDuration::from_hours(7 * 24))?,
        })
    }
}
