// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session request handlers.

use sx_adapters::SandboxAdapter;
use sx_core::{Clock, IdGen, NoteId, Session, SessionId};
use sx_engine::{CreateSession, EngineError, ExecuteRequest, SessionManager};

use crate::protocol::{ExecuteResult, Response, SessionView};

fn error_response(e: EngineError) -> Response {
    Response::error(e.kind(), e.to_string())
}

fn view<S, C: Clock, G>(manager: &SessionManager<S, C, G>, session: &Session) -> SessionView
where
    S: SandboxAdapter,
    G: IdGen,
{
    SessionView::from_session(session, manager.clock().epoch_ms())
}

pub(super) async fn handle_create<S, C, G>(
    manager: &SessionManager<S, C, G>,
    owner: Option<String>,
    note_id: Option<String>,
    cols: Option<u16>,
    rows: Option<u16>,
) -> Response
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    let request = CreateSession {
        owner,
        note_id: note_id.map(NoteId::new),
        cols,
        rows,
    };
    match manager.create(request).await {
        Ok(session) => Response::Created {
            session: view(manager, &session),
        },
        Err(e) => error_response(e),
    }
}

pub(super) fn handle_status<S, C, G>(
    manager: &SessionManager<S, C, G>,
    session_id: String,
) -> Response
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    match manager.status(&SessionId::new(session_id)) {
        Ok(session) => Response::Session {
            session: view(manager, &session),
        },
        Err(e) => error_response(e),
    }
}

pub(super) fn handle_touch<S, C, G>(
    manager: &SessionManager<S, C, G>,
    session_id: String,
) -> Response
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    match manager.touch(&SessionId::new(session_id)) {
        Ok(session) => Response::Session {
            session: view(manager, &session),
        },
        Err(e) => error_response(e),
    }
}

pub(super) async fn handle_input<S, C, G>(
    manager: &SessionManager<S, C, G>,
    session_id: String,
    data: String,
) -> Response
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    match manager.input(&SessionId::new(session_id), &data).await {
        Ok(()) => Response::Ok,
        Err(e) => error_response(e),
    }
}

pub(super) async fn handle_resize<S, C, G>(
    manager: &SessionManager<S, C, G>,
    session_id: String,
    cols: i64,
    rows: i64,
) -> Response
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    match manager.resize(&SessionId::new(session_id), cols, rows).await {
        Ok(_) => Response::Ok,
        Err(e) => error_response(e),
    }
}

pub(super) async fn handle_execute<S, C, G>(
    manager: &SessionManager<S, C, G>,
    session_id: String,
    code: String,
    language: String,
    timeout_ms: Option<u64>,
    request_id: Option<String>,
) -> Response
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    let request = ExecuteRequest {
        session_id: SessionId::new(session_id),
        code,
        language,
        timeout_ms,
        request_id,
    };
    match manager.execute(request).await {
        Ok(outcome) => Response::Executed {
            result: ExecuteResult {
                session_id: outcome.session_id.to_string(),
                command_id: outcome.command_id.to_string(),
                output: outcome.output,
                exit_code: outcome.exit_code,
                duration_ms: outcome.duration_ms,
                replayed: outcome.replayed,
            },
        },
        Err(e) => error_response(e),
    }
}

pub(super) async fn handle_destroy<S, C, G>(
    manager: &SessionManager<S, C, G>,
    session_id: String,
) -> Response
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    let id = SessionId::new(session_id);
    match manager.destroy(&id).await {
        Ok(true) => Response::Destroyed {
            message: "session destroyed".to_string(),
            session_id: id.to_string(),
        },
        Ok(false) => Response::Destroyed {
            message: "session already destroyed".to_string(),
            session_id: id.to_string(),
        },
        Err(e) => error_response(e),
    }
}

pub(super) fn handle_history<S, C, G>(
    manager: &SessionManager<S, C, G>,
    session_id: String,
) -> Response
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    match manager.history(&SessionId::new(session_id)) {
        Ok(entries) => Response::History { entries },
        Err(e) => error_response(e),
    }
}

pub(super) fn handle_list<S, C, G>(manager: &SessionManager<S, C, G>) -> Response
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    let now = manager.clock().epoch_ms();
    Response::Sessions {
        sessions: manager
            .list()
            .iter()
            .map(|s| SessionView::from_session(s, now))
            .collect(),
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
