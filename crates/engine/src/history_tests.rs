// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use sx_core::{FakeClock, SandboxId, Session, SessionStatus};

struct Fixture {
    log: HistoryLog<FakeClock>,
    store: Arc<SessionStore>,
    clock: FakeClock,
    id: SessionId,
}

fn setup(limit: usize) -> Fixture {
    let store = Arc::new(SessionStore::new());
    let clock = FakeClock::new();
    let id = SessionId::new("s-1");
    store.insert(Session::new(
        id.clone(),
        SandboxId::new("sb-1"),
        clock.epoch_ms(),
        60_000,
    ));
    Fixture {
        log: HistoryLog::new(Arc::clone(&store), clock.clone(), limit),
        store,
        clock,
        id,
    }
}

fn cmd(id: &str) -> CommandId {
    CommandId::new(id)
}

#[test]
fn record_appends_pending_entries_in_order() {
    let f = setup(10);
    f.log.record(&f.id, cmd("c1"), "ls", None).unwrap();
    f.clock.advance(Duration::from_millis(5));
    f.log.record(&f.id, cmd("c2"), "print(1)", Some("python")).unwrap();

    let entries = f.log.list(&f.id).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].command, "ls");
    assert_eq!(entries[1].language.as_deref(), Some("python"));
    assert!(entries.iter().all(|e| !e.is_complete()));
    assert!(entries[0].timestamp_ms < entries[1].timestamp_ms);
}

#[test]
fn timestamps_never_decrease_when_clock_goes_back() {
    let f = setup(10);
    f.log.record(&f.id, cmd("c1"), "a", None).unwrap();
    let first = f.log.list(&f.id).unwrap()[0].timestamp_ms;

    f.clock.set_epoch_ms(first - 10_000);
    let second = f.log.record(&f.id, cmd("c2"), "b", None).unwrap();
    assert_eq!(second.timestamp_ms, first);
}

#[test]
fn duplicate_command_id_is_validation_error() {
    let f = setup(10);
    f.log.record(&f.id, cmd("c1"), "a", None).unwrap();
    let err = f.log.record(&f.id, cmd("c1"), "b", None).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn complete_is_immutable_once_set() {
    let f = setup(10);
    f.log.record(&f.id, cmd("c1"), "a", None).unwrap();

    let done = f.log.complete(&f.id, &cmd("c1"), 0, 12).unwrap();
    assert_eq!((done.exit_code, done.duration_ms), (Some(0), Some(12)));

    let err = f.log.complete(&f.id, &cmd("c1"), 1, 99).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let entry = &f.log.list(&f.id).unwrap()[0];
    assert_eq!((entry.exit_code, entry.duration_ms), (Some(0), Some(12)));
}

#[test]
fn complete_unknown_command_is_not_found() {
    let f = setup(10);
    let err = f.log.complete(&f.id, &cmd("never"), 0, 1).unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[test]
fn unknown_session_is_not_found() {
    let f = setup(10);
    let other = SessionId::new("nope");
    assert!(matches!(
        f.log.record(&other, cmd("c1"), "a", None),
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(f.log.list(&other), Err(EngineError::NotFound(_))));
}

#[test]
fn destroyed_session_rejects_record_but_still_lists() {
    let f = setup(10);
    f.log.record(&f.id, cmd("c1"), "a", None).unwrap();

    let cell = f.store.get(&f.id).unwrap();
    cell.record
        .lock()
        .transition(SessionStatus::Destroyed, f.clock.epoch_ms());

    let err = f.log.record(&f.id, cmd("c2"), "b", None).unwrap_err();
    assert!(matches!(err, EngineError::Expired(_)));
    assert_eq!(f.log.list(&f.id).unwrap().len(), 1);
}

#[test]
fn oldest_entries_are_evicted_past_the_limit() {
    let f = setup(3);
    for n in 1..=5 {
        f.log.record(&f.id, cmd(&format!("c{n}")), "x", None).unwrap();
    }
    let ids: Vec<_> = f
        .log
        .list(&f.id)
        .unwrap()
        .into_iter()
        .map(|e| e.command_id.to_string())
        .collect();
    assert_eq!(ids, vec!["c3", "c4", "c5"]);
}
