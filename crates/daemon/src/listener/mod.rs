// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and serving
//! each on its own task. Every connection carries one request; a `Stream`
//! request keeps its connection open for the life of the attachment.

mod sessions;
mod stream;

use std::sync::Arc;
use std::time::Instant;

use sx_adapters::SandboxAdapter;
use sx_core::{Clock, IdGen, SessionId};
use sx_engine::SessionManager;
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::protocol::{self, Request, Response, StatsView, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Shared by every connection task
pub(crate) struct ListenCtx<S, C: Clock, G> {
    pub manager: Arc<SessionManager<S, C, G>>,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
}

/// Listener task for accepting socket connections.
pub struct Listener<S, C: Clock, G> {
    socket: UnixListener,
    ctx: Arc<ListenCtx<S, C, G>>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl<S, C, G> Listener<S, C, G>
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    pub fn new(
        socket: UnixListener,
        manager: Arc<SessionManager<S, C, G>>,
        start_time: Instant,
        shutdown: Arc<Notify>,
    ) -> Self {
        Self {
            socket,
            ctx: Arc::new(ListenCtx {
                manager,
                start_time,
                shutdown,
            }),
        }
    }

    /// Run the listener loop until shutdown, spawning tasks for each connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            match e {
                                ConnectionError::Protocol(
                                    protocol::ProtocolError::ConnectionClosed,
                                ) => debug!("Client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("Connection timeout")
                                }
                                _ => error!("Connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
pub(crate) async fn handle_connection<S, C, G>(
    stream: UnixStream,
    ctx: &ListenCtx<S, C, G>,
) -> Result<(), ConnectionError>
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;

    // Frequent polling requests at debug, mutations at info
    match &request {
        Request::Ping
        | Request::Hello { .. }
        | Request::Status { .. }
        | Request::Stats
        | Request::ListSessions
        | Request::History { .. } => debug!(request = ?request, "received query"),
        // Input carries keystrokes; keep them out of the log
        Request::Input { session_id, data } => {
            debug!(%session_id, bytes = data.len(), "received input")
        }
        _ => tracing::info!(request = ?request, "received request"),
    }

    if let Request::Stream { session_id } = request {
        return stream::handle_stream(
            &ctx.manager,
            SessionId::new(session_id),
            reader,
            &mut writer,
        )
        .await;
    }

    let response = handle_request(request, ctx).await;

    debug!("Sending response: {:?}", response);
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;

    Ok(())
}

/// Handle a single request and return a response.
pub(crate) async fn handle_request<S, C, G>(
    request: Request,
    ctx: &ListenCtx<S, C, G>,
) -> Response
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    let manager = &ctx.manager;
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Create {
            owner,
            note_id,
            cols,
            rows,
        } => sessions::handle_create(manager, owner, note_id, cols, rows).await,

        Request::Status { session_id } => sessions::handle_status(manager, session_id),

        Request::Touch { session_id } => sessions::handle_touch(manager, session_id),

        Request::Input { session_id, data } => {
            sessions::handle_input(manager, session_id, data).await
        }

        Request::Resize {
            session_id,
            cols,
            rows,
        } => sessions::handle_resize(manager, session_id, cols, rows).await,

        Request::Execute {
            session_id,
            code,
            language,
            timeout_ms,
            request_id,
        } => {
            sessions::handle_execute(manager, session_id, code, language, timeout_ms, request_id)
                .await
        }

        Request::Destroy { session_id } => sessions::handle_destroy(manager, session_id).await,

        Request::History { session_id } => sessions::handle_history(manager, session_id),

        Request::ListSessions => sessions::handle_list(manager),

        Request::Stats => {
            let stats = manager.stats();
            Response::Stats {
                stats: StatsView {
                    active_sessions: stats.active_sessions,
                    idle_sessions: stats.idle_sessions,
                    destroyed_sessions: stats.destroyed_sessions,
                    total_created: stats.total_created,
                    total_destroyed: stats.total_destroyed,
                    uptime_secs: ctx.start_time.elapsed().as_secs(),
                },
            }
        }

        // Handled in handle_connection; reaching here means a misrouted request
        Request::Stream { session_id } => Response::error(
            sx_core::ErrorKind::Internal,
            format!("stream for {session_id} must own its connection"),
        ),

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
