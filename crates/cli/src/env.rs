// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::ClientError;

// --- Duration helper (private) ---

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

// --- State directory ---

/// Resolve state directory: SX_STATE_DIR > XDG_STATE_HOME/sx > ~/.local/state/sx
pub fn state_dir() -> Result<PathBuf, ClientError> {
    if let Ok(dir) = std::env::var("SX_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("sx"));
    }
    let home = std::env::var("HOME").map_err(|_| ClientError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/sx"))
}

/// Offline queue file. SX_QUEUE_PATH overrides the default under the state dir.
pub fn queue_path() -> Result<PathBuf, ClientError> {
    if let Ok(path) = std::env::var("SX_QUEUE_PATH") {
        return Ok(PathBuf::from(path));
    }
    Ok(state_dir()?.join("offline-queue.json"))
}

// --- Daemon binary ---

pub fn daemon_binary() -> Option<String> {
    std::env::var("SX_DAEMON_BINARY").ok()
}

// --- Timeouts ---

pub fn timeout_ipc_ms() -> Option<Duration> {
    parse_duration_ms("SX_TIMEOUT_IPC_MS")
}
pub fn timeout_exec_ms() -> Option<Duration> {
    parse_duration_ms("SX_TIMEOUT_EXEC_MS")
}
pub fn timeout_connect_ms() -> Option<Duration> {
    parse_duration_ms("SX_TIMEOUT_CONNECT_MS")
}
pub fn timeout_exit_ms() -> Option<Duration> {
    parse_duration_ms("SX_TIMEOUT_EXIT_MS")
}
pub fn connect_poll_ms() -> Option<Duration> {
    parse_duration_ms("SX_CONNECT_POLL_MS")
}
pub fn watch_interval_ms() -> Option<Duration> {
    parse_duration_ms("SX_WATCH_INTERVAL_MS")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
