// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execute requests captured while the daemon was unreachable

use crate::session::{NoteId, SessionId};
use serde::{Deserialize, Serialize};

/// A queued execute request. `id` doubles as the idempotency key on replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineQueueItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<NoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    /// Target session; when absent the replay opens a new session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub code: String,
    pub language: String,
    pub timestamp_ms: u64,
}

impl OfflineQueueItem {
    pub fn new(code: impl Into<String>, language: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            id: String::new(),
            note_id: None,
            block_id: None,
            session_id: None,
            code: code.into(),
            language: language.into(),
            timestamp_ms,
        }
    }

    pub fn with_session(mut self, session_id: Option<SessionId>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_note(mut self, note_id: Option<NoteId>, block_id: Option<String>) -> Self {
        self.note_id = note_id;
        self.block_id = block_id;
        self
    }
}
