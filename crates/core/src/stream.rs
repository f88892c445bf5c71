// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream events pushed to session observers. Never persisted.

use crate::session::{Session, SessionStatus};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    Output,
    Status,
    Error,
    Heartbeat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub kind: StreamEventKind,
    #[serde(default)]
    pub data: Value,
    pub timestamp_ms: u64,
}

impl StreamEvent {
    pub fn output(text: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            kind: StreamEventKind::Output,
            data: json!({ "text": text.into() }),
            timestamp_ms,
        }
    }

    /// Status snapshot of a session, sent on attach and on every status change.
    pub fn status(session: &Session, timestamp_ms: u64) -> Self {
        Self::status_of(session.status, session.last_activity_at_ms, timestamp_ms)
    }

    pub fn status_of(status: SessionStatus, last_activity_at_ms: u64, timestamp_ms: u64) -> Self {
        Self {
            kind: StreamEventKind::Status,
            data: json!({
                "status": status,
                "last_activity_at_ms": last_activity_at_ms,
            }),
            timestamp_ms,
        }
    }

    /// Status event announcing that a submitted command finished.
    pub fn completion(
        status: SessionStatus,
        command_id: &str,
        exit_code: i32,
        duration_ms: u64,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            kind: StreamEventKind::Status,
            data: json!({
                "status": status,
                "command_id": command_id,
                "exit_code": exit_code,
                "duration_ms": duration_ms,
            }),
            timestamp_ms,
        }
    }

    pub fn error(message: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            kind: StreamEventKind::Error,
            data: json!({ "message": message.into() }),
            timestamp_ms,
        }
    }

    pub fn heartbeat(timestamp_ms: u64) -> Self {
        Self {
            kind: StreamEventKind::Heartbeat,
            data: Value::Null,
            timestamp_ms,
        }
    }

    /// Text payload of an output event
    pub fn text(&self) -> Option<&str> {
        self.data.get("text").and_then(Value::as_str)
    }

    /// Session status carried by a status event
    pub fn session_status(&self) -> Option<SessionStatus> {
        if self.kind != StreamEventKind::Status {
            return None;
        }
        self.data
            .get("status")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// True for the status event that ends a stream
    pub fn is_terminal(&self) -> bool {
        self.session_status() == Some(SessionStatus::Destroyed)
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
