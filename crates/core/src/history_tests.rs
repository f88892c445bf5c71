// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pending_entry_has_no_terminal_fields() {
    let e = CommandHistoryEntry::pending(CommandId::new("c1"), "ls", 10);
    assert!(!e.is_complete());
    assert_eq!(e.exit_code, None);
    assert_eq!(e.duration_ms, None);
}

#[test]
fn complete_sets_both_fields_once() {
    let mut e = CommandHistoryEntry::pending(CommandId::new("c1"), "ls", 10).with_language("bash");
    assert!(e.complete(0, 25));
    assert_eq!((e.exit_code, e.duration_ms), (Some(0), Some(25)));

    assert!(!e.complete(1, 99));
    assert_eq!((e.exit_code, e.duration_ms), (Some(0), Some(25)));
}

#[test]
fn deserializes_without_optional_fields() {
    let e: CommandHistoryEntry =
        serde_json::from_str(r#"{"command_id":"c","command":"pwd","timestamp_ms":5}"#).unwrap();
    assert_eq!(e.language, None);
    assert!(!e.is_complete());
}
