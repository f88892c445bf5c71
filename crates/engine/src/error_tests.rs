// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    spawn_failed   = { SandboxError::SpawnFailed("x".into()),   ErrorKind::Provision },
    timeout        = { SandboxError::Timeout("x".into()),       ErrorKind::Timeout },
    gone           = { SandboxError::NotFound("sx-1".into()),   ErrorKind::Transport },
    command_failed = { SandboxError::CommandFailed("x".into()), ErrorKind::Transport },
)]
fn sandbox_errors_map_to_kinds(err: SandboxError, kind: ErrorKind) {
    assert_eq!(EngineError::from(err).kind(), kind);
}

#[test]
fn config_errors_report_internal() {
    assert_eq!(EngineError::Config("bad".into()).kind(), ErrorKind::Internal);
}

#[test]
fn messages_name_the_session() {
    let id = SessionId::new("abc");
    assert_eq!(EngineError::not_found(&id).to_string(), "session not found: abc");
    assert_eq!(EngineError::expired(&id).to_string(), "session expired: abc");
}
