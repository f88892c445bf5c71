// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTO structs for the IPC protocol.

use serde::{Deserialize, Serialize};
use sx_core::{Session, SessionStatus};

/// Session as reported to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionView {
    pub session_id: String,
    pub sandbox_id: String,
    #[serde(default)]
    pub note_id: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    pub status: SessionStatus,
    pub created_at_ms: u64,
    pub last_activity_at_ms: u64,
    pub expires_at_ms: u64,
    /// Seconds until the destroy deadline at the time of the response
    pub expires_in_secs: u64,
    pub cols: u16,
    pub rows: u16,
}

impl SessionView {
    pub fn from_session(session: &Session, now_ms: u64) -> Self {
        Self {
            session_id: session.session_id.to_string(),
            sandbox_id: session.sandbox_id.to_string(),
            note_id: session.note_id.as_ref().map(ToString::to_string),
            owner: session.owner.clone(),
            status: session.status,
            created_at_ms: session.created_at_ms,
            last_activity_at_ms: session.last_activity_at_ms,
            expires_at_ms: session.expires_at_ms,
            expires_in_secs: session.expires_in_secs(now_ms),
            cols: session.cols,
            rows: session.rows,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteResult {
    pub session_id: String,
    pub command_id: String,
    pub output: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    /// Answered from the daemon's ledger without running again
    #[serde(default)]
    pub replayed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatsView {
    pub active_sessions: usize,
    pub idle_sessions: usize,
    pub destroyed_sessions: usize,
    pub total_created: u64,
    pub total_destroyed: u64,
    #[serde(default)]
    pub uptime_secs: u64,
}
