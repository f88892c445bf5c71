// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn create_provisions_a_sandbox_and_starts_active() {
    let ctx = setup();
    let session = ctx
        .manager
        .create(CreateSession {
            owner: Some("alice".into()),
            note_id: Some(NoteId::new("note-1")),
            cols: Some(120),
            rows: Some(40),
        })
        .await
        .unwrap();

    assert_eq!(session.session_id, "id-1");
    assert_eq!(session.sandbox_id, "fake-1");
    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(session.owner.as_deref(), Some("alice"));
    assert_eq!((session.cols, session.rows), (120, 40));
    assert_eq!(
        session.expires_at_ms,
        session.created_at_ms + 30 * MINUTE * 1000
    );
    assert_eq!(
        ctx.sandbox.calls(),
        vec![SandboxCall::Provision {
            name: "id-1".into(),
            cols: 120,
            rows: 40
        }]
    );
}

#[tokio::test]
async fn create_uses_default_terminal_size() {
    let ctx = setup();
    let session = ctx.create().await;
    assert_eq!((session.cols, session.rows), (80, 24));
}

#[tokio::test]
async fn provision_failure_is_reported_and_nothing_is_stored() {
    let ctx = setup();
    ctx.sandbox
        .fail_provision(Some(SandboxError::SpawnFailed("no capacity".into())));

    let err = ctx.manager.create(CreateSession::default()).await.unwrap_err();

    assert!(matches!(err, EngineError::Provision(_)));
    assert!(ctx.manager.list().is_empty());
    assert_eq!(ctx.manager.stats().total_created, 0);
}

#[tokio::test]
async fn touch_refreshes_activity_and_expiry() {
    let ctx = setup();
    let session = ctx.create().await;
    ctx.advance_secs(5 * MINUTE);

    let touched = ctx.manager.touch(&session.session_id).unwrap();

    assert_eq!(touched.last_activity_at_ms, session.last_activity_at_ms + 300_000);
    assert_eq!(touched.expires_at_ms, touched.last_activity_at_ms + 1_800_000);
}

#[tokio::test]
async fn touch_unknown_session_is_not_found() {
    let ctx = setup();
    let err = ctx.manager.touch(&SessionId::new("nope")).unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn touch_wakes_an_idle_session() {
    let ctx = setup();
    let session = ctx.create().await;
    ctx.advance_secs(16 * MINUTE);
    ctx.manager.sweep().await;
    assert_eq!(ctx.manager.status(&session.session_id).unwrap().status, SessionStatus::Idle);

    let touched = ctx.manager.touch(&session.session_id).unwrap();
    assert_eq!(touched.status, SessionStatus::Active);
}

#[tokio::test]
async fn status_does_not_count_as_activity() {
    let ctx = setup();
    let session = ctx.create().await;
    ctx.advance_secs(MINUTE);

    let view = ctx.manager.status(&session.session_id).unwrap();
    assert_eq!(view.last_activity_at_ms, session.last_activity_at_ms);
}

#[tokio::test]
async fn destroyed_session_rejects_every_activity() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    assert!(ctx.manager.destroy(&id).await.unwrap());

    assert!(matches!(ctx.manager.touch(&id), Err(EngineError::Expired(_))));
    assert!(matches!(
        ctx.manager.input(&id, "ls\n").await,
        Err(EngineError::Expired(_))
    ));
    assert!(matches!(
        ctx.manager.resize(&id, 100, 30).await,
        Err(EngineError::Expired(_))
    ));
    assert!(matches!(
        ctx.manager.execute(shell(&id, "ls")).await,
        Err(EngineError::Expired(_))
    ));
    assert!(matches!(ctx.manager.attach(&id), Err(EngineError::Expired(_))));

    // Still reported as destroyed, never resurrected
    assert_eq!(ctx.manager.status(&id).unwrap().status, SessionStatus::Destroyed);
}

#[tokio::test]
async fn destroy_is_idempotent_and_releases_once() {
    let ctx = setup();
    let session = ctx.create().await;

    assert!(ctx.manager.destroy(&session.session_id).await.unwrap());
    assert!(!ctx.manager.destroy(&session.session_id).await.unwrap());

    assert_eq!(ctx.sandbox.release_count(session.sandbox_id.as_str()), 1);
    assert_eq!(ctx.manager.stats().total_destroyed, 1);
}

#[tokio::test]
async fn destroy_unknown_session_is_not_found() {
    let ctx = setup();
    let err = ctx.manager.destroy(&SessionId::new("ghost")).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn concurrent_destroys_release_exactly_once() {
    let ctx = setup();
    let session = ctx.create().await;
    let id = session.session_id.clone();

    let (a, b) = tokio::join!(ctx.manager.destroy(&id), ctx.manager.destroy(&id));

    assert_ne!(a.unwrap(), b.unwrap());
    assert_eq!(ctx.sandbox.release_count(session.sandbox_id.as_str()), 1);
}

#[tokio::test]
async fn input_is_forwarded_and_counts_as_activity() {
    let ctx = setup();
    let session = ctx.create().await;
    ctx.advance_secs(10);

    ctx.manager.input(&session.session_id, "ls -la\r").await.unwrap();

    let sandbox = ctx.sandbox.get_sandbox("fake-1").unwrap();
    assert_eq!(sandbox.input, vec!["ls -la\r".to_string()]);
    let view = ctx.manager.status(&session.session_id).unwrap();
    assert_eq!(view.last_activity_at_ms, session.last_activity_at_ms + 10_000);
}

#[tokio::test]
async fn empty_input_is_rejected() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let err = ctx.manager.input(&id, "").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn input_to_a_dead_sandbox_is_a_transport_error() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    ctx.sandbox.set_dead("fake-1");

    let err = ctx.manager.input(&id, "x").await.unwrap_err();
    assert!(matches!(err, EngineError::Transport(_)));
}

#[tokio::test]
async fn resize_updates_record_and_sandbox() {
    let ctx = setup();
    let id = ctx.create().await.session_id;

    let session = ctx.manager.resize(&id, 132, 43).await.unwrap();

    assert_eq!((session.cols, session.rows), (132, 43));
    let sandbox = ctx.sandbox.get_sandbox("fake-1").unwrap();
    assert_eq!((sandbox.cols, sandbox.rows), (132, 43));
}

#[yare::parameterized(
    negative_cols = { -1, 24 },
    zero_rows     = { 80, 0 },
    too_wide      = { 1001, 24 },
    too_tall      = { 80, 5000 },
)]
fn invalid_resize_is_rejected_without_state_change(cols: i64, rows: i64) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let ctx = setup();
        let before = ctx.create().await;
        ctx.advance_secs(30);
        ctx.sandbox.clear_calls();

        let err = ctx.manager.resize(&before.session_id, cols, rows).await.unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(ctx.manager.status(&before.session_id).unwrap(), before);
        assert!(ctx.sandbox.calls().is_empty());
    });
}

#[tokio::test]
async fn list_returns_live_sessions_oldest_first() {
    let ctx = setup();
    let first = ctx.create().await;
    ctx.advance_secs(1);
    let second = ctx.create().await;
    ctx.advance_secs(1);
    let third = ctx.create().await;
    ctx.manager.destroy(&second.session_id).await.unwrap();

    let ids: Vec<_> = ctx
        .manager
        .list()
        .into_iter()
        .map(|s| s.session_id)
        .collect();
    assert_eq!(ids, vec![first.session_id, third.session_id]);
}

#[tokio::test]
async fn stats_count_sessions_by_status() {
    let ctx = setup();
    let a = ctx.create().await;
    let _b = ctx.create().await;
    ctx.advance_secs(16 * MINUTE);
    ctx.manager.sweep().await;
    let c = ctx.create().await;
    ctx.manager.touch(&a.session_id).unwrap();
    ctx.manager.destroy(&c.session_id).await.unwrap();

    assert_eq!(
        ctx.manager.stats(),
        SessionStats {
            active_sessions: 1,
            idle_sessions: 1,
            destroyed_sessions: 1,
            total_created: 3,
            total_destroyed: 1,
        }
    );
}

#[tokio::test]
async fn shutdown_destroys_everything_and_refuses_new_sessions() {
    let ctx = setup();
    let a = ctx.create().await;
    let b = ctx.create().await;

    assert_eq!(ctx.manager.shutdown().await, 2);

    for s in [&a, &b] {
        assert_eq!(ctx.manager.status(&s.session_id).unwrap().status, SessionStatus::Destroyed);
        assert_eq!(ctx.sandbox.release_count(s.sandbox_id.as_str()), 1);
    }
    let err = ctx.manager.create(CreateSession::default()).await.unwrap_err();
    assert!(matches!(err, EngineError::Transport(_)));
}

#[test]
fn inconsistent_config_is_refused() {
    let config = EngineConfig {
        idle_threshold_secs: 30 * MINUTE,
        destroy_threshold_secs: 15 * MINUTE,
        ..test_config()
    };
    let result = SessionManager::new(
        config,
        sx_adapters::FakeSandboxAdapter::new(),
        sx_core::FakeClock::new(),
        sx_core::SequentialIdGen::new("id"),
    );
    assert!(matches!(result, Err(EngineError::Config(_))));
}
