// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! A scripted in-memory calendar provider.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use jiff::Timestamp;
use tandem_core::{LocalEvent, RemoteEvent};
use tandem_sync::{RemoteCalendarAdapter, RemoteError};
use tokio::sync::Notify;

/// A provider call recorded by [`MockAdapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List {
        calendars: Vec<String>,
        from: Timestamp,
        to: Timestamp,
    },
    Create { calendar: String, local_id: String },
    Update { calendar: String, remote_id: String },
}

#[derive(Debug, Default)]
struct Inner {
    events: BTreeMap<String, RemoteEvent>,
    next_id: usize,
    calls: Vec<Call>,
    list_failures: VecDeque<RemoteError>,
    create_failures: VecDeque<RemoteError>,
    update_failures: VecDeque<RemoteError>,
}

/// Stateful provider double: creates and updates change what later lists
/// return. Failures are injected per call, in order.
#[derive(Debug)]
pub struct MockAdapter {
    inner: Mutex<Inner>,
    authenticated: AtomicBool,
    hold_lists: AtomicBool,
    /// Signaled when a held list call has started.
    pub list_started: Notify,
    release: Notify,
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self {
            inner: Mutex::default(),
            authenticated: AtomicBool::new(true),
            hold_lists: AtomicBool::new(false),
            list_started: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[allow(dead_code)]
impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: impl IntoIterator<Item = RemoteEvent>) -> Self {
        let adapter = Self::new();
        for event in events {
            adapter.insert(event);
        }
        adapter
    }

    /// Puts an event on the provider side, as another client would.
    pub fn insert(&self, event: RemoteEvent) {
        let mut inner = self.inner.lock().unwrap();
        inner.events.insert(event.remote_id.clone(), event);
    }

    /// Deletes an event on the provider side.
    pub fn remove(&self, remote_id: &str) {
        self.inner.lock().unwrap().events.remove(remote_id);
    }

    pub fn remote(&self, remote_id: &str) -> Option<RemoteEvent> {
        self.inner.lock().unwrap().events.get(remote_id).cloned()
    }

    pub fn remote_count(&self) -> usize {
        self.inner.lock().unwrap().events.len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Windows of the list calls so far, as `(from, to)`.
    pub fn list_windows(&self) -> Vec<(Timestamp, Timestamp)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::List { from, to, .. } => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    pub fn count_lists(&self) -> usize {
        self.count(|c| matches!(c, Call::List { .. }))
    }

    pub fn count_creates(&self) -> usize {
        self.count(|c| matches!(c, Call::Create { .. }))
    }

    pub fn count_updates(&self) -> usize {
        self.count(|c| matches!(c, Call::Update { .. }))
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }

    pub fn fail_next_list(&self, err: RemoteError) {
        self.inner.lock().unwrap().list_failures.push_back(err);
    }

    pub fn fail_next_create(&self, err: RemoteError) {
        self.inner.lock().unwrap().create_failures.push_back(err);
    }

    pub fn fail_next_update(&self, err: RemoteError) {
        self.inner.lock().unwrap().update_failures.push_back(err);
    }

    /// Makes every list call wait for [`release_lists`](Self::release_lists).
    pub fn hold_lists(&self) {
        self.hold_lists.store(true, Ordering::SeqCst);
    }

    pub fn release_lists(&self) {
        self.hold_lists.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.inner.lock().unwrap().calls.iter().filter(|c| f(c)).count()
    }
}

#[async_trait]
impl RemoteCalendarAdapter for MockAdapter {
    async fn list_events(
        &self,
        calendar_ids: &[String],
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<RemoteEvent>, RemoteError> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(Call::List {
                calendars: calendar_ids.to_vec(),
                from,
                to,
            });
            if let Some(err) = inner.list_failures.pop_front() {
                return Err(err);
            }
        }

        if self.hold_lists.load(Ordering::SeqCst) {
            self.list_started.notify_one();
            self.release.notified().await;
        }

        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .values()
            .filter(|e| calendar_ids.contains(&e.remote_calendar_id))
            .filter(|e| e.start <= to && e.end >= from)
            .cloned()
            .collect())
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        event: &LocalEvent,
    ) -> Result<String, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Create {
            calendar: calendar_id.to_string(),
            local_id: event.id.clone(),
        });
        if let Some(err) = inner.create_failures.pop_front() {
            return Err(err);
        }

        inner.next_id += 1;
        let remote_id = format!("remote-{}", inner.next_id);
        let remote = RemoteEvent::from_local(remote_id.clone(), calendar_id, event);
        inner.events.insert(remote_id.clone(), remote);
        Ok(remote_id)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        remote_id: &str,
        event: &LocalEvent,
    ) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Update {
            calendar: calendar_id.to_string(),
            remote_id: remote_id.to_string(),
        });
        if let Some(err) = inner.update_failures.pop_front() {
            return Err(err);
        }
        if !inner.events.contains_key(remote_id) {
            return Err(RemoteError::NotFound(remote_id.to_string()));
        }

        let remote = RemoteEvent::from_local(remote_id, calendar_id, event);
        inner.events.insert(remote_id.to_string(), remote);
        Ok(())
    }

    async fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }
}
