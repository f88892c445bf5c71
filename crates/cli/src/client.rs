// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::daemon_process::{
    cleanup_stale_socket, daemon_socket, probe_socket, read_startup_error,
    start_daemon_background, wrap_with_startup_error,
};

use sx_core::{CommandHistoryEntry, ErrorKind, StreamEvent};
use sx_daemon::protocol::{self, ProtocolError};
use sx_daemon::{ExecuteResult, Request, Response, SessionView, StatsView, PROTOCOL_VERSION};
use thiserror::Error;
use tokio::net::UnixStream;

/// Timeout for IPC requests (everything except execute and stream)
pub fn timeout_ipc() -> Duration {
    crate::env::timeout_ipc_ms().unwrap_or(Duration::from_secs(5))
}

/// How long to wait for an execute answer when the request names no timeout
pub fn timeout_exec() -> Duration {
    crate::env::timeout_exec_ms().unwrap_or(Duration::from_secs(30))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    crate::env::timeout_connect_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    crate::env::timeout_exit_ms().unwrap_or(Duration::from_secs(2))
}

/// Polling interval for connection retries
pub fn poll_interval() -> Duration {
    crate::env::connect_poll_ms().unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{kind}: {message}")]
    Rejected { kind: ErrorKind, message: String },

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,
}

impl ClientError {
    /// True when the daemon could not be reached or did not answer in time.
    ///
    /// The same request may succeed later. An error response is an answer
    /// from the daemon, including a sandbox timeout: the daemon has recorded
    /// it under the request id, so a retry would only replay it.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::DaemonNotRunning
            | ClientError::DaemonStartFailed(_)
            | ClientError::DaemonStartTimeout
            | ClientError::Io(_) => true,
            ClientError::Protocol(e) => matches!(
                e,
                ProtocolError::Io(_) | ProtocolError::Timeout | ProtocolError::ConnectionClosed
            ),
            ClientError::Rejected { .. }
            | ClientError::UnexpectedResponse
            | ClientError::NoStateDir => false,
        }
    }

    /// Error kind reported by the daemon, if it answered with one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

fn rejected(kind: ErrorKind, message: String) -> ClientError {
    ClientError::Rejected { kind, message }
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Connect to existing daemon (no auto-start)
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket()?;
        Self::at(&socket_path)
    }

    /// Client for an explicit socket path
    pub fn at(socket_path: &Path) -> Result<Self, ClientError> {
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }
        Ok(Self {
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Connect to daemon, auto-starting if not running
    pub fn connect_or_start() -> Result<Self, ClientError> {
        match Self::connect() {
            Ok(client) => {
                // A crashed daemon leaves its socket file behind
                if probe_socket(&client.socket_path) {
                    Ok(client)
                } else {
                    cleanup_stale_socket()?;
                    let child = start_daemon_background()?;
                    Self::connect_with_retry(timeout_connect(), child)
                }
            }
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child)
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    fn connect_with_retry(
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Ok(Some(status)) = child.try_wait() {
                // Exited during startup; the reason is in the daemon log
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error() {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    std::thread::sleep(poll_interval());
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect() {
                Ok(client) if probe_socket(&client.socket_path) => return Ok(client),
                Ok(_) | Err(ClientError::DaemonNotRunning) => {
                    std::thread::sleep(poll_interval());
                }
                Err(e) => return Err(wrap_with_startup_error(e)),
            }
        }

        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send a request and receive a response with specific timeouts
    async fn send_with_timeout(
        &self,
        request: &Request,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        protocol::write_request(&mut writer, request, write_timeout).await?;
        let response = protocol::read_response(&mut reader, read_timeout).await?;
        Ok(response)
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        self.send_with_timeout(request, timeout_ipc(), timeout_ipc())
            .await
    }

    /// Helper for simple requests that expect Ok or Error responses
    async fn send_simple(&self, request: &Request) -> Result<(), ClientError> {
        match self.send(request).await? {
            Response::Ok => Ok(()),
            Response::Error { kind, message } => Err(rejected(kind, message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Session view from a `Created` or `Session` response
    async fn send_for_session(&self, request: &Request) -> Result<SessionView, ClientError> {
        match self.send(request).await? {
            Response::Created { session } | Response::Session { session } => Ok(session),
            Response::Error { kind, message } => Err(rejected(kind, message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            Response::Error { kind, message } => Err(rejected(kind, message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        let request = Request::Hello {
            version: PROTOCOL_VERSION.to_string(),
        };
        match self.send(&request).await? {
            Response::Hello { version } => Ok(version),
            Response::Error { kind, message } => Err(rejected(kind, message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn create(
        &self,
        owner: Option<String>,
        note_id: Option<String>,
        cols: Option<u16>,
        rows: Option<u16>,
    ) -> Result<SessionView, ClientError> {
        let request = Request::Create {
            owner,
            note_id,
            cols,
            rows,
        };
        self.send_for_session(&request).await
    }

    pub async fn status(&self, session_id: &str) -> Result<SessionView, ClientError> {
        let request = Request::Status {
            session_id: session_id.to_string(),
        };
        self.send_for_session(&request).await
    }

    pub async fn touch(&self, session_id: &str) -> Result<SessionView, ClientError> {
        let request = Request::Touch {
            session_id: session_id.to_string(),
        };
        self.send_for_session(&request).await
    }

    pub async fn input(&self, session_id: &str, data: &str) -> Result<(), ClientError> {
        let request = Request::Input {
            session_id: session_id.to_string(),
            data: data.to_string(),
        };
        self.send_simple(&request).await
    }

    pub async fn resize(&self, session_id: &str, cols: i64, rows: i64) -> Result<(), ClientError> {
        let request = Request::Resize {
            session_id: session_id.to_string(),
            cols,
            rows,
        };
        self.send_simple(&request).await
    }

    /// Run code in a session and wait for its result.
    ///
    /// The read timeout covers the daemon-side execution deadline plus the
    /// usual IPC allowance.
    pub async fn execute(
        &self,
        session_id: &str,
        code: &str,
        language: &str,
        timeout_ms: Option<u64>,
        request_id: Option<String>,
    ) -> Result<ExecuteResult, ClientError> {
        let exec_timeout = timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(timeout_exec);
        let request = Request::Execute {
            session_id: session_id.to_string(),
            code: code.to_string(),
            language: language.to_string(),
            timeout_ms,
            request_id,
        };
        match self
            .send_with_timeout(&request, exec_timeout + timeout_ipc(), timeout_ipc())
            .await?
        {
            Response::Executed { result } => Ok(result),
            Response::Error { kind, message } => Err(rejected(kind, message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Destroy a session; returns the daemon's message
    pub async fn destroy(&self, session_id: &str) -> Result<String, ClientError> {
        let request = Request::Destroy {
            session_id: session_id.to_string(),
        };
        match self.send(&request).await? {
            Response::Destroyed { message, .. } => Ok(message),
            Response::Error { kind, message } => Err(rejected(kind, message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn history(&self, session_id: &str) -> Result<Vec<CommandHistoryEntry>, ClientError> {
        let request = Request::History {
            session_id: session_id.to_string(),
        };
        match self.send(&request).await? {
            Response::History { entries } => Ok(entries),
            Response::Error { kind, message } => Err(rejected(kind, message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionView>, ClientError> {
        match self.send(&Request::ListSessions).await? {
            Response::Sessions { sessions } => Ok(sessions),
            Response::Error { kind, message } => Err(rejected(kind, message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn stats(&self) -> Result<StatsView, ClientError> {
        match self.send(&Request::Stats).await? {
            Response::Stats { stats } => Ok(stats),
            Response::Error { kind, message } => Err(rejected(kind, message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            Response::Error { kind, message } => Err(rejected(kind, message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Follow a session's event stream until it ends.
    ///
    /// `on_event` returns false to stop early. Returns the number of events
    /// delivered. The stream ends normally after the terminal status event or
    /// when the daemon closes the connection.
    pub async fn stream<F>(&self, session_id: &str, mut on_event: F) -> Result<usize, ClientError>
    where
        F: FnMut(&StreamEvent) -> bool,
    {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();
        let request = Request::Stream {
            session_id: session_id.to_string(),
        };
        protocol::write_request(&mut writer, &request, timeout_ipc()).await?;

        let mut delivered = 0;
        loop {
            let bytes = match protocol::read_message(&mut reader).await {
                Ok(bytes) => bytes,
                Err(ProtocolError::ConnectionClosed) => break,
                Err(e) => return Err(e.into()),
            };
            match protocol::decode::<Response>(&bytes)? {
                Response::Event { event } => {
                    delivered += 1;
                    let keep_going = on_event(&event);
                    if !keep_going || event.is_terminal() {
                        break;
                    }
                }
                Response::Error { kind, message } => return Err(rejected(kind, message)),
                _ => return Err(ClientError::UnexpectedResponse),
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
