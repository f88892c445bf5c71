// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[tokio::test]
async fn execute_runs_code_and_records_history() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    ctx.sandbox.set_exec_result("print(1)", "1\n", 0);

    let outcome = ctx
        .manager
        .execute(ExecuteRequest {
            language: "py".into(),
            ..shell(&id, "print(1)")
        })
        .await
        .unwrap();

    assert_eq!(outcome.output, "1\n");
    assert_eq!(outcome.exit_code, 0);
    assert!(!outcome.replayed);

    let history = ctx.manager.history(&id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].command_id, outcome.command_id);
    assert_eq!(history[0].command, "print(1)");
    assert_eq!(history[0].language.as_deref(), Some("python"));
    assert_eq!(history[0].exit_code, Some(0));
    assert!(matches!(
        ctx.sandbox.calls().last(),
        Some(SandboxCall::Execute { language: sx_adapters::Language::Python, .. })
    ));
}

#[tokio::test]
async fn nonzero_exit_is_a_successful_execute() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    ctx.sandbox.set_exec_result("false", "", 1);

    let outcome = ctx.manager.execute(shell(&id, "false")).await.unwrap();

    assert_eq!(outcome.exit_code, 1);
    assert_eq!(ctx.manager.history(&id).unwrap()[0].exit_code, Some(1));
}

#[tokio::test]
async fn history_keeps_submission_order_with_monotone_timestamps() {
    let ctx = setup();
    let id = ctx.create().await.session_id;

    for cmd in ["a", "b", "c"] {
        ctx.manager.execute(shell(&id, cmd)).await.unwrap();
        ctx.advance_secs(1);
    }

    let history = ctx.manager.history(&id).unwrap();
    let commands: Vec<_> = history.iter().map(|e| e.command.as_str()).collect();
    assert_eq!(commands, vec!["a", "b", "c"]);
    assert!(history.windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
    assert!(history.iter().all(|e| e.is_complete()));
}

#[tokio::test]
async fn completed_entries_cannot_be_completed_again() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let outcome = ctx.manager.execute(shell(&id, "ls")).await.unwrap();

    let err = ctx
        .manager
        .history_log()
        .complete(&id, &outcome.command_id, 99, 1)
        .unwrap_err();

    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(ctx.manager.history(&id).unwrap()[0].exit_code, Some(0));
}

#[tokio::test]
async fn replayed_request_id_returns_first_result_without_running() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let request = ExecuteRequest {
        request_id: Some("q-1".into()),
        ..shell(&id, "echo once")
    };

    let first = ctx.manager.execute(request.clone()).await.unwrap();
    let second = ctx.manager.execute(request).await.unwrap();

    assert_eq!(ctx.sandbox.execute_count(), 1);
    assert_eq!(ctx.manager.history(&id).unwrap().len(), 1);
    assert!(second.replayed);
    assert_eq!(
        ExecuteOutcome {
            replayed: false,
            ..second
        },
        first
    );
}

#[tokio::test]
async fn replay_is_answered_even_after_session_is_destroyed() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let request = ExecuteRequest {
        request_id: Some("q-2".into()),
        ..shell(&id, "ls")
    };
    ctx.manager.execute(request.clone()).await.unwrap();
    ctx.manager.destroy(&id).await.unwrap();

    let replay = ctx.manager.execute(request).await.unwrap();
    assert!(replay.replayed);
}

#[tokio::test]
async fn failed_execute_is_replayed_as_the_same_failure() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let request = ExecuteRequest {
        request_id: Some("q-3".into()),
        ..shell(&id, "ls")
    };
    ctx.sandbox
        .fail_execute(Some(SandboxError::CommandFailed("pane died".into())));
    let first = ctx.manager.execute(request.clone()).await.unwrap_err();

    ctx.sandbox.fail_execute(None);
    let second = ctx.manager.execute(request).await.unwrap_err();
    assert_eq!(first, second);
    assert_eq!(ctx.sandbox.execute_count(), 1);
}

#[tokio::test]
async fn timed_out_request_id_runs_only_once() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let request = ExecuteRequest {
        request_id: Some("q-timeout".into()),
        ..shell(&id, "sleep 999")
    };
    ctx.sandbox
        .fail_execute(Some(SandboxError::Timeout("deadline".into())));

    let first = ctx.manager.execute(request.clone()).await.unwrap_err();
    let second = ctx.manager.execute(request).await.unwrap_err();

    assert!(matches!(first, EngineError::Timeout(_)));
    assert_eq!(second, first);
    assert_eq!(ctx.sandbox.execute_count(), 1);
    assert_eq!(ctx.manager.history(&id).unwrap().len(), 1);
}

#[yare::parameterized(
    empty_code       = { "   ", "shell", None },
    unknown_language = { "x", "cobol", None },
    zero_timeout     = { "x", "shell", Some(0) },
    huge_timeout     = { "x", "shell", Some(300_001) },
)]
fn invalid_execute_is_rejected(code: &str, language: &str, timeout_ms: Option<u64>) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let ctx = setup();
        let id = ctx.create().await.session_id;

        let err = ctx
            .manager
            .execute(ExecuteRequest {
                session_id: id.clone(),
                code: code.into(),
                language: language.into(),
                timeout_ms,
                request_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(ctx.sandbox.execute_count(), 0);
        assert!(ctx.manager.history(&id).unwrap().is_empty());
    });
}

#[tokio::test(start_paused = true)]
async fn timeout_completes_history_with_failure_code() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    ctx.sandbox.set_exec_delay(Some(Duration::from_secs(60)));

    let err = ctx
        .manager
        .execute(ExecuteRequest {
            timeout_ms: Some(100),
            ..shell(&id, "sleep 60")
        })
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Timeout(_)));
    assert_eq!(err.kind(), sx_core::ErrorKind::Timeout);
    let history = ctx.manager.history(&id).unwrap();
    assert_eq!(history[0].exit_code, Some(FAILED_EXIT_CODE));
}

#[tokio::test]
async fn duration_is_measured_on_the_clock() {
    let ctx = setup();
    let id = ctx.create().await.session_id;

    let outcome = ctx.manager.execute(shell(&id, "ls")).await.unwrap();

    // The fake clock does not move on its own
    assert_eq!(outcome.duration_ms, 0);
    assert_eq!(ctx.manager.history(&id).unwrap()[0].duration_ms, Some(0));
}

#[tokio::test(start_paused = true)]
async fn execute_publishes_output_and_completion() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let mut observer = ctx.manager.attach(&id).unwrap();
    ctx.sandbox.set_exec_result("ls", "a b c", 0);

    let outcome = ctx.manager.execute(shell(&id, "ls")).await.unwrap();

    let events = buffered(&mut observer).await;
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].session_status(), Some(SessionStatus::Active));
    assert_eq!(events[1].text(), Some("a b c"));
    assert_eq!(events[2].kind, StreamEventKind::Status);
    assert_eq!(events[2].data["command_id"], outcome.command_id.as_str());
    assert_eq!(events[2].data["exit_code"], 0);
}

#[tokio::test]
async fn history_limit_evicts_oldest_entries() {
    let ctx = setup_with(EngineConfig {
        history_limit: 2,
        ..test_config()
    });
    let id = ctx.create().await.session_id;
    for cmd in ["one", "two", "three"] {
        ctx.manager.execute(shell(&id, cmd)).await.unwrap();
    }

    let commands: Vec<_> = ctx
        .manager
        .history(&id)
        .unwrap()
        .into_iter()
        .map(|e| e.command)
        .collect();
    assert_eq!(commands, vec!["two", "three"]);
}

#[tokio::test]
async fn executes_on_one_session_run_in_submission_order() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    ctx.sandbox.set_exec_delay(Some(Duration::from_millis(20)));

    let (a, b) = tokio::join!(
        ctx.manager.execute(shell(&id, "first")),
        ctx.manager.execute(shell(&id, "second")),
    );
    a.unwrap();
    b.unwrap();

    let codes: Vec<_> = ctx
        .sandbox
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            SandboxCall::Execute { code, .. } => Some(code),
            _ => None,
        })
        .collect();
    assert_eq!(codes, vec!["first", "second"]);
    let history = ctx.manager.history(&id).unwrap();
    assert!(history.iter().all(|e| e.is_complete()));
}
