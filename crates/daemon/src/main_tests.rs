// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::tempdir;

#[test]
#[serial(env)]
fn startup_marker_is_appended_with_pid() {
    let dir = tempdir().unwrap();
    let config = Config::for_state_dir(dir.path().join("state")).unwrap();
    std::fs::create_dir_all(&config.state_dir).unwrap();
    std::fs::write(&config.log_path, "previous run\n").unwrap();

    write_startup_marker(&config).unwrap();

    let log = std::fs::read_to_string(&config.log_path).unwrap();
    let mut lines = log.lines();
    assert_eq!(lines.next(), Some("previous run"));
    assert_eq!(
        lines.next(),
        Some(format!("{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id()).as_str())
    );
}

#[test]
#[serial(env)]
fn startup_marker_creates_the_log_directory() {
    let dir = tempdir().unwrap();
    let config = Config::for_state_dir(dir.path().join("nested/state")).unwrap();

    write_startup_marker(&config).unwrap();

    assert!(config.log_path.exists());
}

#[test]
#[serial(env)]
fn startup_error_is_written_synchronously() {
    let dir = tempdir().unwrap();
    let config = Config::for_state_dir(dir.path().to_path_buf()).unwrap();

    write_startup_error(&config, &LifecycleError::NoStateDir);

    let log = std::fs::read_to_string(&config.log_path).unwrap();
    assert!(log.contains("ERROR Failed to start daemon: Could not determine state directory"));
}
