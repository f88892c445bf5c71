// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared session store.
//!
//! The map lock is held only to look up, insert or remove a cell. Each
//! cell carries its own locks so sessions never contend with each other:
//!
//! - `record` and `history` are short `parking_lot` locks, never held
//!   across an await. When both are needed, `record` is taken first.
//! - `observers` guards the stream fan-out set; taken after `record`.
//! - `ops` is an async lock that serializes input/resize/execute for the
//!   session in the order they were received.

use crate::broker::ObserverSet;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use sx_core::{CommandHistoryEntry, Session, SessionId, SessionStatus};

pub struct SessionCell {
    id: SessionId,
    pub(crate) record: Mutex<Session>,
    pub(crate) history: Mutex<VecDeque<CommandHistoryEntry>>,
    pub(crate) observers: Mutex<ObserverSet>,
    pub(crate) ops: tokio::sync::Mutex<()>,
}

impl SessionCell {
    fn new(session: Session) -> Self {
        Self {
            id: session.session_id.clone(),
            record: Mutex::new(session),
            history: Mutex::new(VecDeque::new()),
            observers: Mutex::new(ObserverSet::default()),
            ops: tokio::sync::Mutex::new(()),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Copy of the current record
    pub fn session(&self) -> Session {
        self.record.lock().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.record.lock().status
    }
}

/// All sessions known to the daemon, live and recently destroyed
#[derive(Default)]
pub struct SessionStore {
    cells: RwLock<HashMap<SessionId, Arc<SessionCell>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Session) -> Arc<SessionCell> {
        let cell = Arc::new(SessionCell::new(session));
        self.cells.write().insert(cell.id.clone(), Arc::clone(&cell));
        cell
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionCell>> {
        self.cells.read().get(id).cloned()
    }

    pub fn remove(&self, id: &SessionId) -> Option<Arc<SessionCell>> {
        self.cells.write().remove(id)
    }

    /// Snapshot of every cell, for sweeps and listings
    pub fn cells(&self) -> Vec<Arc<SessionCell>> {
        self.cells.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
