// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use sx_core::SessionStatus;
use sx_daemon::protocol::{read_request, write_response};
use tempfile::tempdir;
use tokio::net::UnixListener;

fn view(id: &str) -> SessionView {
    SessionView {
        session_id: id.to_string(),
        sandbox_id: "sx-1".to_string(),
        note_id: None,
        owner: None,
        status: SessionStatus::Active,
        created_at_ms: 1_000,
        last_activity_at_ms: 1_000,
        expires_at_ms: 1_801_000,
        expires_in_secs: 1800,
        cols: 80,
        rows: 24,
    }
}

/// Serve one connection: record the request and answer with each response in turn.
fn serve_once(
    listener: UnixListener,
    responses: Vec<Response>,
) -> tokio::task::JoinHandle<Request> {
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (mut reader, mut writer) = stream.into_split();
        let request = read_request(&mut reader, Duration::from_secs(1))
            .await
            .unwrap();
        for response in &responses {
            write_response(&mut writer, response, Duration::from_secs(1))
                .await
                .unwrap();
        }
        request
    })
}

fn fake_daemon(
    responses: Vec<Response>,
) -> (tempfile::TempDir, DaemonClient, tokio::task::JoinHandle<Request>) {
    let dir = tempdir().unwrap();
    let socket = dir.path().join("daemon.sock");
    let listener = UnixListener::bind(&socket).unwrap();
    let server = serve_once(listener, responses);
    let client = DaemonClient::at(&socket).unwrap();
    (dir, client, server)
}

#[test]
#[serial(env)]
fn connect_without_socket_is_not_running() {
    let state_dir = tempdir().unwrap();
    std::env::set_var("SX_STATE_DIR", state_dir.path());

    let result = DaemonClient::connect();
    assert!(matches!(result, Err(ClientError::DaemonNotRunning)));
    std::env::remove_var("SX_STATE_DIR");
}

#[yare::parameterized(
    not_running     = { ClientError::DaemonNotRunning, true },
    start_timeout   = { ClientError::DaemonStartTimeout, true },
    io              = { ClientError::Io(std::io::Error::other("refused")), true },
    ipc_timeout     = { ClientError::Protocol(ProtocolError::Timeout), true },
    closed          = { ClientError::Protocol(ProtocolError::ConnectionClosed), true },
    transport       = { rejected(ErrorKind::Transport, "tmux gone".into()), false },
    exec_timeout    = { rejected(ErrorKind::Timeout, "deadline".into()), false },
    validation      = { rejected(ErrorKind::Validation, "empty code".into()), false },
    not_found       = { rejected(ErrorKind::NotFound, "no session".into()), false },
    expired         = { rejected(ErrorKind::Expired, "destroyed".into()), false },
    provision       = { rejected(ErrorKind::Provision, "no capacity".into()), false },
    unexpected      = { ClientError::UnexpectedResponse, false },
    too_large       = { ClientError::Protocol(ProtocolError::MessageTooLarge { size: 2, max: 1 }), false },
)]
fn retryable_classification(error: ClientError, retryable: bool) {
    assert_eq!(error.is_retryable(), retryable);
}

#[test]
fn rejected_error_shows_kind_and_message() {
    let err = rejected(ErrorKind::Expired, "session s-1 was destroyed".into());
    assert_eq!(err.to_string(), "expired: session s-1 was destroyed");
    assert_eq!(err.kind(), Some(ErrorKind::Expired));
}

#[tokio::test]
async fn create_sends_request_and_returns_view() {
    let (_dir, client, server) = fake_daemon(vec![Response::Created {
        session: view("s-1"),
    }]);

    let session = client
        .create(Some("alice".into()), Some("n-1".into()), None, None)
        .await
        .unwrap();
    assert_eq!(session.session_id, "s-1");

    let request = server.await.unwrap();
    assert_eq!(
        request,
        Request::Create {
            owner: Some("alice".into()),
            note_id: Some("n-1".into()),
            cols: None,
            rows: None,
        }
    );
}

#[tokio::test]
async fn error_response_becomes_rejected() {
    let (_dir, client, _server) = fake_daemon(vec![Response::error(
        ErrorKind::NotFound,
        "unknown session: s-9",
    )]);

    let err = client.status("s-9").await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn execute_forwards_request_id() {
    let result = ExecuteResult {
        session_id: "s-1".into(),
        command_id: "c-1".into(),
        output: "hi\n".into(),
        exit_code: 0,
        duration_ms: 4,
        replayed: true,
    };
    let (_dir, client, server) = fake_daemon(vec![Response::Executed {
        result: result.clone(),
    }]);

    let got = client
        .execute("s-1", "echo hi", "shell", Some(1_000), Some("req-1".into()))
        .await
        .unwrap();
    assert_eq!(got, result);

    match server.await.unwrap() {
        Request::Execute {
            request_id,
            timeout_ms,
            ..
        } => {
            assert_eq!(request_id.as_deref(), Some("req-1"));
            assert_eq!(timeout_ms, Some(1_000));
        }
        other => panic!("unexpected request: {other:?}"),
    }
}

#[tokio::test]
async fn mismatched_response_is_unexpected() {
    let (_dir, client, _server) = fake_daemon(vec![Response::Pong]);
    let err = client.stats().await.unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedResponse));
}

#[tokio::test]
async fn stream_delivers_events_until_terminal_status() {
    let output = StreamEvent::output("hello", 2);
    let destroyed = StreamEvent::status_of(SessionStatus::Destroyed, 1, 3);
    let (_dir, client, server) = fake_daemon(vec![
        Response::Event {
            event: StreamEvent::status_of(SessionStatus::Active, 1, 1),
        },
        Response::Event {
            event: output.clone(),
        },
        Response::Event {
            event: destroyed.clone(),
        },
    ]);

    let mut seen = Vec::new();
    let delivered = client
        .stream("s-1", |event| {
            seen.push(event.clone());
            true
        })
        .await
        .unwrap();

    assert_eq!(delivered, 3);
    assert_eq!(seen[1], output);
    assert_eq!(seen[2], destroyed);
    assert!(matches!(server.await.unwrap(), Request::Stream { .. }));
}

#[tokio::test]
async fn stream_stops_when_callback_declines() {
    let (_dir, client, _server) = fake_daemon(vec![
        Response::Event {
            event: StreamEvent::heartbeat(1),
        },
        Response::Event {
            event: StreamEvent::heartbeat(2),
        },
    ]);

    let delivered = client.stream("s-1", |_| false).await.unwrap();
    assert_eq!(delivered, 1);
}

#[tokio::test]
async fn stream_rejection_is_reported() {
    let (_dir, client, _server) =
        fake_daemon(vec![Response::error(ErrorKind::Expired, "destroyed")]);

    let err = client.stream("s-1", |_| true).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Expired));
}
