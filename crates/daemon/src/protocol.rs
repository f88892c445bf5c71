// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC Protocol for daemon communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

use serde::{Deserialize, Serialize};
use sx_core::{CommandHistoryEntry, ErrorKind, StreamEvent};

#[path = "protocol_types.rs"]
mod types;
pub use types::{ExecuteResult, SessionView, StatsView};

#[path = "protocol_wire.rs"]
mod wire;
pub use wire::{
    decode, encode, read_message, read_request, read_response, write_message, write_request,
    write_response, ProtocolError, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};

/// Request from CLI to daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Create a session and provision its sandbox
    Create {
        #[serde(default)]
        owner: Option<String>,
        #[serde(default)]
        note_id: Option<String>,
        #[serde(default)]
        cols: Option<u16>,
        #[serde(default)]
        rows: Option<u16>,
    },

    /// Session view, without counting as activity
    Status { session_id: String },

    /// Keep a session alive
    Touch { session_id: String },

    /// Raw keystrokes for the session terminal
    Input { session_id: String, data: String },

    /// Resize the session terminal. Signed so bad values reach validation.
    Resize {
        session_id: String,
        cols: i64,
        rows: i64,
    },

    /// Run code and wait for the result
    Execute {
        session_id: String,
        code: String,
        language: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
        /// Idempotency key; replays return the first result
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Destroy a session (idempotent)
    Destroy { session_id: String },

    /// Attach to the session's live event stream
    Stream { session_id: String },

    /// Command history of a session
    History { session_id: String },

    /// All live sessions
    ListSessions,

    /// Aggregate counters
    Stats,

    /// Request daemon shutdown; destroys every session
    Shutdown,
}

/// Response from daemon to CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Daemon is shutting down
    ShuttingDown,

    Created { session: SessionView },

    Session { session: SessionView },

    Sessions { sessions: Vec<SessionView> },

    Executed { result: ExecuteResult },

    Destroyed { session_id: String, message: String },

    History { entries: Vec<CommandHistoryEntry> },

    Stats { stats: StatsView },

    /// One frame of a `Stream` response
    Event { event: StreamEvent },

    /// Error response
    Error { kind: ErrorKind, message: String },
}

impl Response {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
