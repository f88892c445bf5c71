// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream broker: live fan-out of session events to attached observers.
//!
//! Each observer owns a bounded channel. Publishing never blocks: an
//! observer whose buffer is full is dropped from the session and told why
//! with a final `error` event. There is no replay; an observer sees only
//! events published after it attached.

use crate::config::EngineConfig;
use crate::store::{SessionCell, SessionStore};
use crate::EngineError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use sx_core::{Clock, SessionId, SessionStatus, StreamEvent};
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obs-{}", self.0)
    }
}

/// State shared between a slot and its observer.
///
/// `last_word` is delivered after the channel is exhausted (the terminal
/// status on destroy), or immediately once `aborted` is set (overflow).
#[derive(Default)]
struct SlotShared {
    last_word: Mutex<Option<StreamEvent>>,
    aborted: AtomicBool,
}

struct ObserverSlot {
    tx: mpsc::Sender<StreamEvent>,
    shared: Arc<SlotShared>,
}

/// Observers attached to one session
#[derive(Default)]
pub(crate) struct ObserverSet {
    slots: HashMap<ObserverId, ObserverSlot>,
}

impl ObserverSet {
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Deliver `event` to every observer; returns how many received it.
    fn fan_out(&mut self, session_id: &SessionId, event: &StreamEvent, now_ms: u64) -> usize {
        let mut delivered = 0;
        self.slots.retain(|id, slot| match slot.tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(%session_id, observer = %id, "observer buffer full, closing");
                *slot.shared.last_word.lock() =
                    Some(StreamEvent::error("observer buffer overflow", now_ms));
                slot.shared.aborted.store(true, Ordering::Release);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
        delivered
    }

    /// End every stream with `final_event` after already-buffered events.
    fn close_all(&mut self, final_event: &StreamEvent) -> usize {
        let count = self.slots.len();
        for (_, slot) in self.slots.drain() {
            *slot.shared.last_word.lock() = Some(final_event.clone());
        }
        count
    }
}

type ObserverIndex = Arc<Mutex<HashMap<ObserverId, Weak<SessionCell>>>>;

/// Remove an observer from its session. Returns false if already gone.
fn remove_observer(index: &ObserverIndex, id: ObserverId) -> bool {
    let cell = index.lock().remove(&id);
    match cell.and_then(|weak| weak.upgrade()) {
        Some(cell) => cell.observers.lock().slots.remove(&id).is_some(),
        None => false,
    }
}

/// Receiving end of an attachment. Dropping it detaches.
pub struct Observer<C: Clock> {
    id: ObserverId,
    session_id: SessionId,
    rx: mpsc::Receiver<StreamEvent>,
    shared: Arc<SlotShared>,
    index: ObserverIndex,
    heartbeat: Duration,
    clock: C,
    finished: bool,
}

impl<C: Clock> Observer<C> {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Next event for this observer.
    ///
    /// Yields a heartbeat whenever nothing arrives for the heartbeat
    /// interval. Returns `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        if self.shared.aborted.load(Ordering::Acquire) {
            self.finished = true;
            return self.shared.last_word.lock().take();
        }
        match tokio::time::timeout(self.heartbeat, self.rx.recv()).await {
            Ok(Some(event)) => Some(event),
            Ok(None) => {
                self.finished = true;
                self.shared.last_word.lock().take()
            }
            Err(_elapsed) => Some(StreamEvent::heartbeat(self.clock.epoch_ms())),
        }
    }
}

impl<C: Clock> Drop for Observer<C> {
    fn drop(&mut self) {
        if remove_observer(&self.index, self.id) {
            tracing::debug!(session_id = %self.session_id, observer = %self.id, "observer dropped");
        }
    }
}

pub struct StreamBroker<C: Clock> {
    store: Arc<SessionStore>,
    clock: C,
    index: ObserverIndex,
    next_id: AtomicU64,
    buffer: usize,
    heartbeat: Duration,
    destroy_after_ms: u64,
}

impl<C: Clock> StreamBroker<C> {
    pub fn new(store: Arc<SessionStore>, clock: C, config: &EngineConfig) -> Self {
        Self {
            store,
            clock,
            index: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            buffer: config.observer_buffer.max(2),
            heartbeat: config.heartbeat_interval(),
            destroy_after_ms: config.destroy_after_ms(),
        }
    }

    /// Attach a new observer to a live session.
    ///
    /// Counts as session activity. The observer's first event is the
    /// session's current status.
    pub fn attach(&self, session_id: &SessionId) -> Result<Observer<C>, EngineError> {
        let cell = self
            .store
            .get(session_id)
            .ok_or_else(|| EngineError::not_found(session_id))?;
        let now = self.clock.epoch_ms();

        let mut record = cell.record.lock();
        if record.is_destroyed() {
            return Err(EngineError::expired(session_id));
        }
        let was_idle = record.status == SessionStatus::Idle;
        record.touch(now, self.destroy_after_ms);
        let status = StreamEvent::status(&record, now);

        let (tx, rx) = mpsc::channel(self.buffer);
        let shared = Arc::new(SlotShared::default());
        let _ = tx.try_send(status.clone());

        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut observers = cell.observers.lock();
            if was_idle {
                observers.fan_out(session_id, &status, now);
            }
            observers.slots.insert(
                id,
                ObserverSlot {
                    tx,
                    shared: Arc::clone(&shared),
                },
            );
        }
        drop(record);

        self.index.lock().insert(id, Arc::downgrade(&cell));
        tracing::debug!(%session_id, observer = %id, "observer attached");

        Ok(Observer {
            id,
            session_id: session_id.clone(),
            rx,
            shared,
            index: Arc::clone(&self.index),
            heartbeat: self.heartbeat,
            clock: self.clock.clone(),
            finished: false,
        })
    }

    /// Detach an observer. Unknown or already detached ids are a no-op.
    pub fn detach(&self, observer_id: ObserverId) -> bool {
        remove_observer(&self.index, observer_id)
    }

    /// Deliver an event to every observer of a session.
    ///
    /// Returns the number of observers that received it. Publishing to a
    /// destroyed session delivers to nobody.
    pub fn publish(&self, session_id: &SessionId, event: StreamEvent) -> Result<usize, EngineError> {
        let cell = self
            .store
            .get(session_id)
            .ok_or_else(|| EngineError::not_found(session_id))?;
        Ok(self.publish_to(&cell, &event))
    }

    pub(crate) fn publish_to(&self, cell: &SessionCell, event: &StreamEvent) -> usize {
        let now = self.clock.epoch_ms();
        cell.observers.lock().fan_out(cell.id(), event, now)
    }

    /// End every stream of a session with `final_event`.
    pub(crate) fn close_session(&self, cell: &SessionCell, final_event: &StreamEvent) -> usize {
        let closed = cell.observers.lock().close_all(final_event);
        if closed > 0 {
            tracing::debug!(session_id = %cell.id(), closed, "closed observer streams");
        }
        closed
    }

    pub fn observer_count(&self, session_id: &SessionId) -> usize {
        self.store
            .get(session_id)
            .map(|cell| cell.observers.lock().len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
