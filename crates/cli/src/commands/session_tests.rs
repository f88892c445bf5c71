// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sx_core::{CommandId, SessionStatus};

const NOW: u64 = 1_700_000_060_000;

fn view(id: &str, status: SessionStatus) -> SessionView {
    SessionView {
        session_id: id.to_string(),
        sandbox_id: format!("sx-{id}"),
        note_id: Some("note-1".into()),
        owner: Some("alice".into()),
        status,
        created_at_ms: NOW - 120_000,
        last_activity_at_ms: NOW - 30_000,
        expires_at_ms: NOW + 1_770_000,
        expires_in_secs: 1770,
        cols: 120,
        rows: 40,
    }
}

fn render(f: impl FnOnce(&mut Vec<u8>)) -> String {
    let mut out = Vec::new();
    f(&mut out);
    String::from_utf8(out).unwrap()
}

#[test]
fn session_detail() {
    let text = render(|w| format_session(w, &view("s-1", SessionStatus::Idle), NOW));

    assert!(text.contains("Session:  s-1\n"));
    assert!(text.contains("Status:   idle\n"));
    assert!(text.contains("Owner:    alice\n"));
    assert!(text.contains("Note:     note-1\n"));
    assert!(text.contains("Size:     120x40\n"));
    assert!(text.contains("Active:   30s ago\n"));
    assert!(text.contains("Expires:  in 1770s\n"));
}

#[test]
fn destroyed_session_has_no_expiry_line() {
    let text = render(|w| format_session(w, &view("s-1", SessionStatus::Destroyed), NOW));
    assert!(!text.contains("Expires"));
}

#[test]
fn session_list_rows() {
    let mut bare = view("s-2", SessionStatus::Active);
    bare.owner = None;
    let sessions = vec![view("s-1", SessionStatus::Idle), bare];

    let text = render(|w| format_session_list(w, &sessions, NOW));
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("SESSION"));
    assert!(lines[1].starts_with("s-1"));
    assert!(lines[1].contains("idle"));
    assert!(lines[2].contains(" - "));
}

#[test]
fn history_shows_pending_and_completed_commands() {
    let mut done =
        CommandHistoryEntry::pending(CommandId::new("c-1"), "ls -la\necho more", NOW - 5_000);
    done.complete(0, 12);
    let running = CommandHistoryEntry::pending(CommandId::new("c-2"), "sleep 60", NOW - 1_000);

    let text = render(|w| format_history(w, &[done, running], NOW));
    let lines: Vec<&str> = text.lines().collect();

    assert!(lines[1].starts_with("c-1"));
    assert!(lines[1].contains("12ms"));
    assert!(lines[1].ends_with("ls -la"));
    assert!(lines[2].contains("pending"));
    assert!(lines[2].ends_with("sleep 60"));
}

#[yare::parameterized(
    create  = { SessionCommand::Create { owner: None, note: None, cols: None, rows: None }, true },
    list    = { SessionCommand::List, false },
    destroy = { SessionCommand::Destroy { id: "s-1".into() }, false },
)]
fn only_create_starts_the_daemon(command: SessionCommand, starts: bool) {
    assert_eq!(command.starts_daemon(), starts);
}
