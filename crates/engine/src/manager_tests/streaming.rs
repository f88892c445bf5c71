// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test(start_paused = true)]
async fn attach_emits_current_status_first() {
    let ctx = setup();
    let id = ctx.create().await.session_id;

    let mut observer = ctx.manager.attach(&id).unwrap();

    let first = observer.recv().await.unwrap();
    assert_eq!(first.session_status(), Some(SessionStatus::Active));
    let next = observer.recv().await.unwrap();
    assert_eq!(next.kind, StreamEventKind::Heartbeat);
}

#[tokio::test]
async fn attach_unknown_session_is_not_found() {
    let ctx = setup();
    let result = ctx.manager.attach(&SessionId::new("missing"));
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[tokio::test(start_paused = true)]
async fn observers_see_identical_event_sequences() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let mut a = ctx.manager.attach(&id).unwrap();
    let mut b = ctx.manager.attach(&id).unwrap();

    for (i, text) in ["one", "two", "three"].into_iter().enumerate() {
        let delivered = ctx
            .manager
            .broker()
            .publish(&id, StreamEvent::output(text, i as u64))
            .unwrap();
        assert_eq!(delivered, 2);
    }

    let from_a = buffered(&mut a).await;
    let from_b = buffered(&mut b).await;
    assert_eq!(from_a.len(), 4);
    assert_eq!(from_a[1..], from_b[1..]);
}

#[tokio::test(start_paused = true)]
async fn detaching_one_observer_leaves_the_other_attached() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let a = ctx.manager.attach(&id).unwrap();
    let mut b = ctx.manager.attach(&id).unwrap();

    assert!(ctx.manager.detach(a.id()));
    assert!(!ctx.manager.detach(a.id()));
    ctx.manager
        .broker()
        .publish(&id, StreamEvent::output("still here", 1))
        .unwrap();

    let events = buffered(&mut b).await;
    assert_eq!(events.last().and_then(|e| e.text()), Some("still here"));
    assert_eq!(ctx.manager.broker().observer_count(&id), 1);
}

#[tokio::test]
async fn dropping_an_observer_detaches_it() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let observer = ctx.manager.attach(&id).unwrap();
    assert_eq!(ctx.manager.broker().observer_count(&id), 1);

    drop(observer);

    assert_eq!(ctx.manager.broker().observer_count(&id), 0);
}

#[tokio::test(start_paused = true)]
async fn destroy_ends_every_stream_with_terminal_status() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let mut a = ctx.manager.attach(&id).unwrap();
    let mut b = ctx.manager.attach(&id).unwrap();

    ctx.manager.destroy(&id).await.unwrap();

    for observer in [&mut a, &mut b] {
        let first = observer.recv().await.unwrap();
        assert_eq!(first.session_status(), Some(SessionStatus::Active));
        let last = observer.recv().await.unwrap();
        assert!(last.is_terminal());
        assert!(observer.recv().await.is_none());
    }
    assert!(matches!(ctx.manager.attach(&id), Err(EngineError::Expired(_))));
}

#[tokio::test(start_paused = true)]
async fn idle_and_wake_transitions_are_published() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let mut observer = ctx.manager.attach(&id).unwrap();
    assert!(observer.recv().await.is_some());

    ctx.advance_secs(16 * MINUTE);
    ctx.manager.sweep().await;
    ctx.manager.touch(&id).unwrap();

    let statuses: Vec<_> = buffered(&mut observer)
        .await
        .iter()
        .filter_map(|e| e.session_status())
        .collect();
    assert_eq!(statuses, vec![SessionStatus::Idle, SessionStatus::Active]);
}

#[tokio::test(start_paused = true)]
async fn attaching_to_an_idle_session_wakes_it_for_everyone() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    let mut first = ctx.manager.attach(&id).unwrap();
    ctx.advance_secs(16 * MINUTE);
    ctx.manager.sweep().await;

    let _second = ctx.manager.attach(&id).unwrap();

    assert_eq!(ctx.manager.status(&id).unwrap().status, SessionStatus::Active);
    let statuses: Vec<_> = buffered(&mut first)
        .await
        .iter()
        .filter_map(|e| e.session_status())
        .collect();
    assert_eq!(
        statuses,
        vec![SessionStatus::Active, SessionStatus::Idle, SessionStatus::Active]
    );
}

#[tokio::test(start_paused = true)]
async fn slow_observer_is_closed_with_an_error() {
    let ctx = setup_with(EngineConfig {
        observer_buffer: 2,
        ..test_config()
    });
    let id = ctx.create().await.session_id;
    let mut slow = ctx.manager.attach(&id).unwrap();

    // Initial status and the first line fill the buffer
    for i in 0..3 {
        ctx.manager
            .broker()
            .publish(&id, StreamEvent::output(format!("line {i}"), i))
            .unwrap();
    }

    let last = slow.recv().await.unwrap();
    assert_eq!(last.kind, StreamEventKind::Error);
    assert!(slow.recv().await.is_none());
    assert_eq!(ctx.manager.broker().observer_count(&id), 0);
}

#[tokio::test(start_paused = true)]
async fn poll_output_publishes_new_terminal_text_to_watchers() {
    let ctx = setup();
    let id = ctx.create().await.session_id;
    ctx.sandbox.push_output("fake-1", &["$ ls"]);

    // Unwatched sessions are not captured
    assert_eq!(ctx.manager.poll_output().await, 0);
    assert!(!ctx
        .sandbox
        .calls()
        .iter()
        .any(|c| matches!(c, SandboxCall::CaptureOutput { .. })));

    let mut observer = ctx.manager.attach(&id).unwrap();
    assert_eq!(ctx.manager.poll_output().await, 0);
    ctx.sandbox.push_output("fake-1", &["a.txt b.txt"]);
    assert_eq!(ctx.manager.poll_output().await, 1);
    assert_eq!(ctx.manager.poll_output().await, 0);

    let events = buffered(&mut observer).await;
    assert_eq!(events.last().and_then(|e| e.text()), Some("\na.txt b.txt"));
}
