// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn inactive_session_goes_idle_then_destroyed() {
    let ctx = setup();
    let session = ctx.create().await;
    let id = session.session_id.clone();

    ctx.advance_secs(15 * MINUTE);
    assert!(ctx.manager.sweep().await.is_empty());

    ctx.advance_secs(1);
    let report = ctx.manager.sweep().await;
    assert_eq!(report.idled, vec![id.clone()]);
    assert_eq!(ctx.manager.status(&id).unwrap().status, SessionStatus::Idle);

    ctx.advance_secs(15 * MINUTE);
    let report = ctx.manager.sweep().await;
    assert_eq!(report.destroyed, vec![id.clone()]);
    assert_eq!(ctx.manager.status(&id).unwrap().status, SessionStatus::Destroyed);
    assert_eq!(ctx.sandbox.release_count(session.sandbox_id.as_str()), 1);

    // Later sweeps and explicit destroys do not release again
    ctx.manager.sweep().await;
    ctx.manager.destroy(&id).await.unwrap();
    assert_eq!(ctx.sandbox.release_count(session.sandbox_id.as_str()), 1);
}

#[tokio::test]
async fn each_sweep_moves_a_session_one_step() {
    let ctx = setup();
    let id = ctx.create().await.session_id;

    ctx.advance_secs(45 * MINUTE);
    let report = ctx.manager.sweep().await;
    assert_eq!(report.idled, vec![id.clone()]);
    assert!(report.destroyed.is_empty());

    let report = ctx.manager.sweep().await;
    assert_eq!(report.destroyed, vec![id]);
}

#[tokio::test]
async fn activity_keeps_a_session_alive() {
    let ctx = setup();
    let id = ctx.create().await.session_id;

    for _ in 0..6 {
        ctx.advance_secs(10 * MINUTE);
        ctx.manager.input(&id, "\n").await.unwrap();
        assert!(ctx.manager.sweep().await.is_empty());
    }
    assert_eq!(ctx.manager.status(&id).unwrap().status, SessionStatus::Active);
}

#[tokio::test]
async fn idle_session_touched_before_sweep_survives() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    ctx.advance_secs(16 * MINUTE);
    ctx.manager.sweep().await;

    ctx.advance_secs(15 * MINUTE);
    ctx.manager.touch(&id).unwrap();
    let report = ctx.manager.sweep().await;

    assert!(report.destroyed.is_empty());
    assert_eq!(ctx.manager.status(&id).unwrap().status, SessionStatus::Active);
}

#[tokio::test]
async fn tombstones_are_pruned_after_retention() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    ctx.manager.execute(shell(&id, "ls")).await.unwrap();
    ctx.manager.destroy(&id).await.unwrap();

    ctx.advance_secs(59 * MINUTE);
    assert!(ctx.manager.sweep().await.pruned.is_empty());
    assert_eq!(ctx.manager.history(&id).unwrap().len(), 1);

    ctx.advance_secs(2 * MINUTE);
    assert_eq!(ctx.manager.sweep().await.pruned, vec![id.clone()]);
    assert!(matches!(ctx.manager.status(&id), Err(EngineError::NotFound(_))));
    assert!(matches!(ctx.manager.history(&id), Err(EngineError::NotFound(_))));
    assert_eq!(ctx.manager.stats().destroyed_sessions, 0);
    assert_eq!(ctx.manager.stats().total_destroyed, 1);
}
