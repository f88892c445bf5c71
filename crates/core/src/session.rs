// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session record and lifecycle status.
//!
//! A session binds one sandbox to a client for its whole lifetime. The
//! sandbox id is assigned at creation and never changes; the status only
//! moves forward to `Destroyed`, which is terminal.

use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a session (UUID v4 in production).
    pub struct SessionId;
}

crate::define_id! {
    /// Opaque handle of the sandbox backing a session.
    pub struct SandboxId;
}

crate::define_id! {
    /// Reference to the note (document) a session was opened for.
    pub struct NoteId;
}

/// Default terminal width for new sessions
pub const DEFAULT_COLS: u16 = 80;
/// Default terminal height for new sessions
pub const DEFAULT_ROWS: u16 = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Idle,
    Destroyed,
}

impl SessionStatus {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// `Destroyed` accepts nothing; staying in place counts as legal so
    /// repeated touches are no-ops.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        match (self, next) {
            (SessionStatus::Destroyed, _) => false,
            (SessionStatus::Active, _) | (SessionStatus::Idle, _) => true,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == SessionStatus::Destroyed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Idle => "idle",
            SessionStatus::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub sandbox_id: SandboxId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<NoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub status: SessionStatus,
    pub created_at_ms: u64,
    pub last_activity_at_ms: u64,
    /// Destroy deadline while live. Frozen at the destroy time once destroyed.
    pub expires_at_ms: u64,
    pub cols: u16,
    pub rows: u16,
}

impl Session {
    /// Fresh active session; `expires_at_ms` is `now + destroy_after_ms`.
    pub fn new(
        session_id: SessionId,
        sandbox_id: SandboxId,
        now_ms: u64,
        destroy_after_ms: u64,
    ) -> Self {
        Self {
            session_id,
            sandbox_id,
            note_id: None,
            owner: None,
            status: SessionStatus::Active,
            created_at_ms: now_ms,
            last_activity_at_ms: now_ms,
            expires_at_ms: now_ms.saturating_add(destroy_after_ms),
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }

    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_note(mut self, note_id: Option<NoteId>) -> Self {
        self.note_id = note_id;
        self
    }

    pub fn with_size(mut self, cols: u16, rows: u16) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    pub fn is_destroyed(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record activity: refresh the timestamps and promote idle back to active.
    ///
    /// Returns false (and changes nothing) when the session is destroyed.
    pub fn touch(&mut self, now_ms: u64, destroy_after_ms: u64) -> bool {
        if self.is_destroyed() {
            return false;
        }
        // Never move backwards if a caller raced with a newer touch
        self.last_activity_at_ms = self.last_activity_at_ms.max(now_ms);
        self.expires_at_ms = self.last_activity_at_ms.saturating_add(destroy_after_ms);
        self.status = SessionStatus::Active;
        true
    }

    /// Milliseconds since the last recorded activity.
    pub fn inactive_for_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_activity_at_ms)
    }

    /// Seconds left until the destroy deadline, zero once passed or destroyed.
    pub fn expires_in_secs(&self, now_ms: u64) -> u64 {
        if self.is_destroyed() {
            return 0;
        }
        self.expires_at_ms.saturating_sub(now_ms) / 1000
    }

    /// Apply a status change if the lifecycle allows it.
    pub fn transition(&mut self, next: SessionStatus, now_ms: u64) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        if next == SessionStatus::Destroyed {
            self.expires_at_ms = now_ms;
        }
        true
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
