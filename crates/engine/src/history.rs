// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session command history.
//!
//! Entries are appended in submission order with non-decreasing
//! timestamps and capped at `limit` per session. A destroyed session
//! keeps its history for as long as its tombstone is retained.

use crate::store::SessionStore;
use crate::EngineError;
use std::sync::Arc;
use sx_core::{Clock, CommandHistoryEntry, CommandId, SessionId};

pub struct HistoryLog<C: Clock> {
    store: Arc<SessionStore>,
    clock: C,
    limit: usize,
}

impl<C: Clock> HistoryLog<C> {
    pub fn new(store: Arc<SessionStore>, clock: C, limit: usize) -> Self {
        Self {
            store,
            clock,
            limit: limit.max(1),
        }
    }

    /// Append a pending entry for a newly submitted command.
    pub fn record(
        &self,
        session_id: &SessionId,
        command_id: CommandId,
        command: &str,
        language: Option<&str>,
    ) -> Result<CommandHistoryEntry, EngineError> {
        let cell = self
            .store
            .get(session_id)
            .ok_or_else(|| EngineError::not_found(session_id))?;

        let record = cell.record.lock();
        if record.is_destroyed() {
            return Err(EngineError::expired(session_id));
        }

        let mut history = cell.history.lock();
        if history.iter().any(|e| e.command_id == command_id) {
            return Err(EngineError::Validation(format!(
                "duplicate command id {} in session {}",
                command_id, session_id
            )));
        }

        let floor = history.back().map(|e| e.timestamp_ms).unwrap_or(0);
        let timestamp_ms = self.clock.epoch_ms().max(floor);

        let mut entry = CommandHistoryEntry::pending(command_id, command, timestamp_ms);
        if let Some(language) = language {
            entry = entry.with_language(language);
        }
        history.push_back(entry.clone());
        while history.len() > self.limit {
            history.pop_front();
        }
        Ok(entry)
    }

    /// Fill the exit code and duration of a recorded command.
    pub fn complete(
        &self,
        session_id: &SessionId,
        command_id: &CommandId,
        exit_code: i32,
        duration_ms: u64,
    ) -> Result<CommandHistoryEntry, EngineError> {
        let cell = self
            .store
            .get(session_id)
            .ok_or_else(|| EngineError::not_found(session_id))?;

        let mut history = cell.history.lock();
        let Some(entry) = history.iter_mut().find(|e| &e.command_id == command_id) else {
            tracing::error!(
                %session_id,
                %command_id,
                "completion for a command that was never recorded"
            );
            return Err(EngineError::NotFound(format!(
                "command {} in session {}",
                command_id, session_id
            )));
        };

        if !entry.complete(exit_code, duration_ms) {
            return Err(EngineError::Validation(format!(
                "command {} already completed",
                command_id
            )));
        }
        Ok(entry.clone())
    }

    /// Ordered copy of the session's history, oldest first.
    pub fn list(&self, session_id: &SessionId) -> Result<Vec<CommandHistoryEntry>, EngineError> {
        let cell = self
            .store
            .get(session_id)
            .ok_or_else(|| EngineError::not_found(session_id))?;
        let entries = cell.history.lock().iter().cloned().collect();
        Ok(entries)
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
