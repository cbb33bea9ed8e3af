// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The sync state machine.
//!
//! A single actor task owns all mutable sync state: the status, the pending
//! conflicts, the push holds and the last sync time. The cloneable
//! [`SyncOrchestrator`] handle talks to it over a command queue and reads
//! its published [`SyncState`] from a watch channel, so observers never
//! wait for a pass to finish.

use std::collections::{BTreeSet, HashMap};
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use jiff::Timestamp;
use tandem_core::SharedStore;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::conflict::{ConflictDetector, Resolution, SyncConflict};
use crate::policy::ResolutionPolicy;
use crate::reconciler::{PullOutcome, Reconciler};
use crate::scheduler::Scheduler;
use crate::status::{PassReport, SyncKind, SyncState, SyncStatus};
use crate::window::SyncWindow;
use crate::{RemoteCalendarAdapter, RemoteError, SyncConfig, SyncError};

const COMMAND_BUFFER: usize = 32;

/// Reply of a sync pass: the report on success, the aborting error otherwise.
pub type PassResult = Result<PassReport, Arc<SyncError>>;

pub(crate) enum Command {
    Sync {
        kind: SyncKind,
        reply: Option<oneshot::Sender<PassResult>>,
    },
    ResolveConflict {
        id: String,
        resolution: Resolution,
        reply: oneshot::Sender<Result<(), SyncError>>,
    },
    SetRealTime {
        enabled: bool,
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running sync orchestrator.
///
/// Cheap to clone; all clones drive the same actor.
#[derive(Debug, Clone)]
pub struct SyncOrchestrator {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SyncState>,
    in_flight: Arc<AtomicBool>,
    tasks: Arc<std::sync::Mutex<Vec<JoinHandle<()>>>>,
}

impl SyncOrchestrator {
    /// Starts the orchestrator actor and its scheduler on the current
    /// runtime.
    pub fn spawn(
        store: SharedStore,
        adapter: Arc<dyn RemoteCalendarAdapter>,
        config: SyncConfig,
    ) -> Self {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let in_flight = Arc::new(AtomicBool::new(false));

        let reconciler = Reconciler::new(
            store.clone(),
            adapter.clone(),
            ConflictDetector::new(config.start_tolerance),
        )
        .with_default_calendar(config.default_calendar.clone());

        let initial = SyncState {
            real_time: config.real_time,
            ..SyncState::default()
        };
        let (state_tx, state) = watch::channel(initial);

        let scheduler = Scheduler::new(
            commands.downgrade(),
            in_flight.clone(),
            config.full_interval,
            config.realtime_interval,
        );

        let actor = Actor {
            store,
            adapter,
            reconciler,
            policy: ResolutionPolicy::new(config.recency_window),
            calendars: config.calendars,
            retention: config.retention,
            status: SyncStatus::Idle,
            pending: Vec::new(),
            push_holds: HashMap::new(),
            last_sync_time: None,
            real_time: config.real_time,
            state: state_tx,
            in_flight: in_flight.clone(),
        };

        let actor_task = tokio::spawn(actor.run(receiver));
        let scheduler_task = tokio::spawn(scheduler.run(state.clone()));
        tracing::info!(real_time = config.real_time, "sync orchestrator started");

        Self {
            commands,
            state,
            in_flight,
            tasks: Arc::new(std::sync::Mutex::new(vec![actor_task, scheduler_task])),
        }
    }

    /// Runs a full pass.
    ///
    /// Returns `Ok(None)` without doing anything if a pass is already in
    /// flight.
    pub async fn start_full_sync(&self) -> Result<Option<PassReport>, Arc<SyncError>> {
        self.start(SyncKind::Full).await
    }

    /// Runs an incremental pass.
    ///
    /// Errors do not change the status, but are still returned to the caller.
    pub async fn start_incremental_sync(&self) -> Result<Option<PassReport>, Arc<SyncError>> {
        self.start(SyncKind::Incremental).await
    }

    /// Settles a pending conflict with the given resolution.
    pub async fn resolve_conflict(
        &self,
        conflict_id: &str,
        resolution: Resolution,
    ) -> Result<(), SyncError> {
        let (reply, rx) = oneshot::channel();
        let command = Command::ResolveConflict {
            id: conflict_id.to_string(),
            resolution,
            reply,
        };
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::Closed)?;
        rx.await.map_err(|_| SyncError::Closed)?
    }

    /// Starts the short timer. A pass in flight is not affected.
    pub async fn enable_real_time(&self) -> Result<(), SyncError> {
        self.set_real_time(true).await
    }

    /// Stops the short timer. A pass in flight is not affected.
    pub async fn disable_real_time(&self) -> Result<(), SyncError> {
        self.set_real_time(false).await
    }

    /// The current observable state.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// The current status.
    pub fn status(&self) -> SyncStatus {
        self.state.borrow().status.clone()
    }

    /// Progress of the current pass.
    pub fn progress(&self) -> f32 {
        self.state.borrow().progress()
    }

    /// Conflicts waiting for a user decision.
    pub fn pending_conflicts(&self) -> Vec<SyncConflict> {
        self.state.borrow().pending_conflicts.clone()
    }

    /// When the last pass completed.
    pub fn last_sync_time(&self) -> Option<Timestamp> {
        self.state.borrow().last_sync_time
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    /// Stops the scheduler and the actor. A pass in flight finishes first.
    pub async fn shutdown(&self) -> Result<(), SyncError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Shutdown { reply })
            .await
            .map_err(|_| SyncError::Closed)?;
        rx.await.map_err(|_| SyncError::Closed)?;

        let tasks = match self.tasks.lock() {
            Ok(mut tasks) => mem::take(&mut *tasks),
            Err(poisoned) => mem::take(&mut *poisoned.into_inner()),
        };
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(err = %e, "sync task ended abnormally");
            }
        }

        tracing::info!("sync orchestrator stopped");
        Ok(())
    }

    async fn start(&self, kind: SyncKind) -> Result<Option<PassReport>, Arc<SyncError>> {
        if !try_begin(&self.in_flight, kind) {
            return Ok(None);
        }

        let mut slot = PassSlot::claimed(&self.in_flight);
        let (reply, rx) = oneshot::channel();
        let command = Command::Sync {
            kind,
            reply: Some(reply),
        };
        if self.commands.send(command).await.is_err() {
            return Err(Arc::new(SyncError::Closed));
        }
        // The actor releases the slot once the pass is over.
        slot.hand_over();

        match rx.await {
            Ok(result) => result.map(Some),
            Err(_) => Err(Arc::new(SyncError::Closed)),
        }
    }

    async fn set_real_time(&self, enabled: bool) -> Result<(), SyncError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::SetRealTime { enabled, reply })
            .await
            .map_err(|_| SyncError::Closed)?;
        rx.await.map_err(|_| SyncError::Closed)
    }
}

/// Claims the single pass slot. Returns `false` if a pass is in flight.
pub(crate) fn try_begin(in_flight: &AtomicBool, kind: SyncKind) -> bool {
    let claimed = in_flight
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok();
    if !claimed {
        tracing::warn!(%kind, "sync already in flight, dropping trigger");
    }
    claimed
}

/// A claimed pass slot that is released on drop unless handed over to the
/// actor, so a caller dropped mid-send cannot leave it claimed.
struct PassSlot<'a> {
    in_flight: &'a AtomicBool,
    handed_over: bool,
}

impl<'a> PassSlot<'a> {
    fn claimed(in_flight: &'a AtomicBool) -> Self {
        Self {
            in_flight,
            handed_over: false,
        }
    }

    fn hand_over(&mut self) {
        self.handed_over = true;
    }
}

impl Drop for PassSlot<'_> {
    fn drop(&mut self) {
        if !self.handed_over {
            self.in_flight.store(false, Ordering::Release);
        }
    }
}

struct Actor {
    store: SharedStore,
    adapter: Arc<dyn RemoteCalendarAdapter>,
    reconciler: Reconciler,
    policy: ResolutionPolicy,
    calendars: Vec<String>,
    retention: jiff::SignedDuration,

    status: SyncStatus,
    pending: Vec<SyncConflict>,
    /// Events kept out of phase (a) while their content is unchanged: the
    /// provider rejected it, or the user chose to skip its conflict.
    push_holds: HashMap<String, Timestamp>,
    last_sync_time: Option<Timestamp>,
    real_time: bool,

    state: watch::Sender<SyncState>,
    in_flight: Arc<AtomicBool>,
}

impl Actor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Sync { kind, reply } => {
                    let result = self.run_pass(kind).await;
                    self.in_flight.store(false, Ordering::Release);
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    }
                }
                Command::ResolveConflict {
                    id,
                    resolution,
                    reply,
                } => {
                    let result = self.resolve_conflict(&id, resolution).await;
                    let _ = reply.send(result);
                }
                Command::SetRealTime { enabled, reply } => {
                    if self.real_time != enabled {
                        tracing::info!(enabled, "real-time sync toggled");
                    }
                    self.real_time = enabled;
                    self.publish();
                    let _ = reply.send(());
                }
                Command::Shutdown { reply } => {
                    let _ = reply.send(());
                    break;
                }
            }
        }
        tracing::debug!("sync actor stopped");
    }

    #[tracing::instrument(skip(self))]
    async fn run_pass(&mut self, kind: SyncKind) -> PassResult {
        let now = Timestamp::now();
        let previous = mem::replace(&mut self.status, SyncStatus::Syncing { progress: 0.0 });
        self.publish();
        tracing::info!("sync pass started");

        match self.run_phases(kind, now).await {
            Ok(report) => {
                self.last_sync_time = Some(now);
                self.status = if self.pending.is_empty() {
                    SyncStatus::Completed { at: now }
                } else {
                    SyncStatus::ConflictResolutionRequired
                };
                self.publish();
                tracing::info!(status = %self.status, ?report, "sync pass finished");
                Ok(report)
            }
            Err(e) => {
                let error = Arc::new(e);
                match kind {
                    SyncKind::Full => {
                        tracing::error!(err = %error, "sync pass failed");
                        self.status = SyncStatus::Failed {
                            error: error.clone(),
                        };
                    }
                    SyncKind::Incremental => {
                        tracing::warn!(err = %error, "incremental sync pass failed");
                        self.status = self.settled(previous);
                    }
                }
                self.publish();
                Err(error)
            }
        }
    }

    async fn run_phases(&mut self, kind: SyncKind, now: Timestamp) -> Result<PassReport, SyncError> {
        let mut report = PassReport::default();

        self.push_phase(now, &mut report).await?;
        self.set_progress(0.25);

        let window = match kind {
            SyncKind::Full => SyncWindow::full(now)?,
            SyncKind::Incremental => SyncWindow::incremental(now, self.last_sync_time)?,
        };
        self.pull_phase(window, now, &mut report).await?;
        self.set_progress(0.5);

        self.resolve_phase(now, &mut report).await?;
        self.set_progress(0.75);

        self.persist_phase(now, &mut report).await?;
        self.set_progress(1.0);

        Ok(report)
    }

    /// Phase (a): push local changes bound to a remote calendar.
    async fn push_phase(&mut self, now: Timestamp, report: &mut PassReport) -> Result<(), SyncError> {
        if !self.adapter.is_authenticated().await {
            return Err(SyncError::NotAuthenticated);
        }

        let candidates: Vec<_> = self
            .store
            .all_events()
            .await?
            .into_iter()
            .filter(|e| e.needs_push && e.remote_calendar_id.is_some())
            .filter(|e| !self.pending.iter().any(|c| c.local.id == e.id))
            .filter(|e| self.push_holds.get(&e.id) != Some(&e.last_modified_at))
            .collect();

        tracing::debug!(count = candidates.len(), "pushing local changes");
        for event in candidates {
            match self.reconciler.push(&event.id, now).await {
                Ok(_) => report.pushed += 1,
                Err(e) => {
                    report.push_failures += 1;
                    self.record_push_failure(&event.id, event.last_modified_at, e)?;
                }
            }
        }
        Ok(())
    }

    /// Phase (b): pull remote events in the window and detect conflicts.
    async fn pull_phase(
        &mut self,
        window: SyncWindow,
        now: Timestamp,
        report: &mut PassReport,
    ) -> Result<(), SyncError> {
        let mut calendars: BTreeSet<String> = self.calendars.iter().cloned().collect();
        calendars.extend(
            self.store
                .all_events()
                .await?
                .into_iter()
                .filter_map(|e| e.remote_calendar_id),
        );
        if calendars.is_empty() {
            tracing::debug!("no calendars to pull");
            return Ok(());
        }

        let calendars: Vec<String> = calendars.into_iter().collect();
        let remotes = self
            .adapter
            .list_events(&calendars, window.from, window.to)
            .await?;
        report.pulled = remotes.len();
        tracing::debug!(count = remotes.len(), from = %window.from, to = %window.to, "pulled remote events");

        for remote in &remotes {
            match self.reconciler.pull(remote, now).await? {
                PullOutcome::Created(_) => report.created += 1,
                PullOutcome::Updated(local) => {
                    self.pending.retain(|c| c.local.id != local.id);
                    self.push_holds.remove(&local.id);
                }
                PullOutcome::Conflict(conflict) => {
                    report.conflicts_detected += 1;
                    self.pending.retain(|c| c.local.id != conflict.local.id);

                    match self.policy.auto_resolve(&conflict, now) {
                        Some(resolution) => match self.auto_apply(&conflict, resolution, now).await {
                            Ok(true) => report.auto_resolved += 1,
                            Ok(false) => {}
                            Err(e) => {
                                self.pending.push(conflict);
                                return Err(e);
                            }
                        },
                        None => {
                            tracing::debug!(conflict = %conflict.id, kind = %conflict.kind, "conflict needs a decision");
                            self.pending.push(conflict);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Phase (c): retry the policy on conflicts still pending.
    async fn resolve_phase(&mut self, now: Timestamp, report: &mut PassReport) -> Result<(), SyncError> {
        let mut conflicts = mem::take(&mut self.pending).into_iter();
        while let Some(conflict) = conflicts.next() {
            let Some(resolution) = self.policy.auto_resolve(&conflict, now) else {
                self.pending.push(conflict);
                continue;
            };

            match self.auto_apply(&conflict, resolution, now).await {
                Ok(true) => report.auto_resolved += 1,
                Ok(false) => {}
                Err(e) => {
                    self.pending.push(conflict);
                    self.pending.extend(conflicts);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Phase (d): purge metadata of long-past events, then flush the store.
    async fn persist_phase(&mut self, now: Timestamp, report: &mut PassReport) -> Result<(), SyncError> {
        let cutoff = now.checked_sub(self.retention)?;

        {
            let store = self.store.lock().await;
            for mut event in store.all_events().await? {
                if !event.ended_before(cutoff) {
                    continue;
                }

                let mut purged = self.push_holds.remove(&event.id).is_some();
                let before = self.pending.len();
                self.pending.retain(|c| c.local.id != event.id);
                purged |= self.pending.len() != before;

                if event.needs_push {
                    event.needs_push = false;
                    event.last_pushed_at = Some(event.last_modified_at);
                    store.upsert(&event).await?;
                    purged = true;
                }

                if purged {
                    tracing::debug!(id = %event.id, end = %event.end, "purged sync metadata");
                    report.purged += 1;
                }
            }
        }

        self.store.persist().await?;
        Ok(())
    }

    /// Applies an automatic resolution. Returns whether the conflict is
    /// settled; per-event failures are logged and leave the event to the
    /// next pass.
    async fn auto_apply(
        &mut self,
        conflict: &SyncConflict,
        resolution: Resolution,
        now: Timestamp,
    ) -> Result<bool, SyncError> {
        match self.reconciler.apply(conflict, resolution, now).await {
            Ok(()) => {
                tracing::debug!(conflict = %conflict.id, ?resolution, "conflict auto-resolved");
                Ok(true)
            }
            Err(SyncError::StaleConflict(_)) => {
                tracing::debug!(conflict = %conflict.id, "local event changed, dropping stale conflict");
                Ok(false)
            }
            Err(e) => {
                self.record_push_failure(&conflict.local.id, conflict.local.last_modified_at, e)?;
                Ok(false)
            }
        }
    }

    async fn resolve_conflict(&mut self, id: &str, resolution: Resolution) -> Result<(), SyncError> {
        let conflict = self
            .pending
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| SyncError::ConflictNotFound(id.to_string()))?;

        let now = Timestamp::now();
        let result = self.reconciler.apply(&conflict, resolution, now).await;
        if let Err(e) = &result
            && e.is_pass_fatal()
        {
            return result;
        }

        self.pending.retain(|c| c.id != id);
        match &result {
            Ok(()) if resolution == Resolution::Skip => {
                // Hold the local copy back so the next pull re-evaluates it.
                self.push_holds
                    .insert(conflict.local.id.clone(), conflict.local.last_modified_at);
            }
            Ok(()) => {}
            Err(SyncError::Remote(RemoteError::Validation(_))) => {
                self.push_holds
                    .insert(conflict.local.id.clone(), conflict.local.last_modified_at);
            }
            Err(e) => {
                tracing::warn!(conflict = %conflict.id, err = %e, "conflict resolution did not complete");
            }
        }

        if self.pending.is_empty() && self.status == SyncStatus::ConflictResolutionRequired {
            self.status = SyncStatus::Completed { at: now };
        }
        self.publish();
        tracing::info!(conflict = %conflict.id, ?resolution, remaining = self.pending.len(), "conflict resolved");
        result
    }

    /// Logs a per-event push failure, or returns it if it aborts the pass.
    fn record_push_failure(
        &mut self,
        id: &str,
        modified_at: Timestamp,
        err: SyncError,
    ) -> Result<(), SyncError> {
        if err.is_pass_fatal() {
            return Err(err);
        }

        if let SyncError::Remote(RemoteError::Validation(_)) = &err {
            self.push_holds.insert(id.to_string(), modified_at);
        }
        tracing::warn!(id, err = %err, "push failed");
        Ok(())
    }

    /// The status to fall back to after an incremental pass failed.
    fn settled(&self, previous: SyncStatus) -> SyncStatus {
        if !self.pending.is_empty() {
            return SyncStatus::ConflictResolutionRequired;
        }
        match previous {
            SyncStatus::ConflictResolutionRequired | SyncStatus::Syncing { .. } => self
                .last_sync_time
                .map_or(SyncStatus::Idle, |at| SyncStatus::Completed { at }),
            other => other,
        }
    }

    fn set_progress(&mut self, progress: f32) {
        self.status = SyncStatus::Syncing { progress };
        self.publish();
    }

    fn publish(&self) {
        self.state.send_replace(SyncState {
            status: self.status.clone(),
            pending_conflicts: self.pending.clone(),
            last_sync_time: self.last_sync_time,
            real_time: self.real_time,
        });
    }
}
