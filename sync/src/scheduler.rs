// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use jiff::SignedDuration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::orchestrator::{Command, try_begin};
use crate::status::{SyncKind, SyncState};

const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Owns both sync cadences and turns their ticks into sync commands.
///
/// The long timer always runs but only triggers a full pass while real-time
/// mode is off. The short timer triggers incremental passes and restarts
/// whenever real-time mode is switched on. Ticks arriving while a pass is
/// in flight are dropped.
pub(crate) struct Scheduler {
    commands: mpsc::WeakSender<Command>,
    in_flight: Arc<AtomicBool>,
    full_period: Duration,
    realtime_period: Duration,
}

impl Scheduler {
    pub(crate) fn new(
        commands: mpsc::WeakSender<Command>,
        in_flight: Arc<AtomicBool>,
        full_interval: SignedDuration,
        realtime_interval: SignedDuration,
    ) -> Self {
        Self {
            commands,
            in_flight,
            full_period: full_interval.unsigned_abs().max(MIN_PERIOD),
            realtime_period: realtime_interval.unsigned_abs().max(MIN_PERIOD),
        }
    }

    /// Runs until the orchestrator goes away.
    pub(crate) async fn run(self, mut state: watch::Receiver<SyncState>) {
        let mut full = interval(self.full_period);
        let mut realtime = interval(self.realtime_period);
        let mut real_time = state.borrow_and_update().real_time;

        loop {
            tokio::select! {
                _ = full.tick() => {
                    if !real_time && !self.trigger(SyncKind::Full) {
                        break;
                    }
                }
                _ = realtime.tick(), if real_time => {
                    if !self.trigger(SyncKind::Incremental) {
                        break;
                    }
                }
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let enabled = state.borrow_and_update().real_time;
                    if enabled != real_time {
                        real_time = enabled;
                        if real_time {
                            realtime.reset();
                        }
                        tracing::debug!(real_time, "scheduler switched cadence");
                    }
                }
            }
        }
        tracing::debug!("sync scheduler stopped");
    }

    /// Sends a sync command unless a pass is in flight. Returns `false` once
    /// the orchestrator is gone.
    fn trigger(&self, kind: SyncKind) -> bool {
        let Some(commands) = self.commands.upgrade() else {
            return false;
        };

        if !try_begin(&self.in_flight, kind) {
            return true;
        }

        tracing::debug!(%kind, "scheduled sync");
        match commands.try_send(Command::Sync { kind, reply: None }) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(%kind, "sync command queue full, dropping tick");
                self.in_flight.store(false, Ordering::Release);
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.in_flight.store(false, Ordering::Release);
                false
            }
        }
    }
}

/// An interval whose first tick is one full period from now.
fn interval(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}
