// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[yare::parameterized(
    seconds = { 42, "42s" },
    minutes = { 125, "2m 5s" },
    hours   = { 3_725, "1h 2m 5s" },
)]
fn uptime(secs: u64, expected: &str) {
    assert_eq!(format_uptime(secs), expected);
}

#[test]
fn last_lines_of_log() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("daemon.log");
    std::fs::write(&path, "one\ntwo\nthree\nfour\n").unwrap();

    assert_eq!(read_last_lines(&path, 2).unwrap(), vec!["three", "four"]);
    assert_eq!(read_last_lines(&path, 10).unwrap().len(), 4);
}
