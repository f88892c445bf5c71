// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management utilities.
//!
//! Functions for starting, stopping, and monitoring the sxd process.

use crate::client::ClientError;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Start the daemon in the background, returning the child process handle
pub fn start_daemon_background() -> Result<std::process::Child, ClientError> {
    let sxd_path = find_sxd_binary();

    Command::new(&sxd_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Wait for a process to exit
pub async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(crate::client::poll_interval()).await;
    }
    false
}

/// SX_DAEMON_BINARY, then an `sxd` next to the running `sx`, then PATH.
pub fn find_sxd_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return PathBuf::from(path);
    }

    let sibling = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("sxd")));
    match sibling {
        Some(path) if path.exists() => path,
        _ => PathBuf::from("sxd"),
    }
}

/// Get the socket path for the user-level daemon.
pub fn daemon_socket() -> Result<PathBuf, ClientError> {
    Ok(daemon_dir()?.join("daemon.sock"))
}

pub fn daemon_dir() -> Result<PathBuf, ClientError> {
    crate::env::state_dir()
}

/// Remove an orphaned PID file.
pub fn cleanup_stale_pid(dir: &Path) {
    let pid_path = dir.join("daemon.pid");
    if pid_path.exists() {
        let _ = std::fs::remove_file(&pid_path);
    }
}

/// Get the PID from the daemon PID file, if it exists
pub fn read_daemon_pid() -> Result<Option<u32>, ClientError> {
    let pid_path = daemon_dir()?.join("daemon.pid");
    match std::fs::read_to_string(&pid_path) {
        Ok(content) => Ok(content.trim().parse::<u32>().ok()),
        Err(_) => Ok(None),
    }
}

fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check if a process with the given PID exists
pub fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}

pub fn force_kill_daemon(pid: u32) -> bool {
    kill_signal("-9", pid)
}

/// Marker sxd writes to its log before anything else on each start.
const STARTUP_MARKER_PREFIX: &str = "--- sxd: starting (pid: ";

/// Read daemon log from the last startup marker, looking for errors.
pub fn read_startup_error() -> Option<String> {
    let log_path = daemon_dir().ok()?.join("daemon.log");
    let content = std::fs::read_to_string(&log_path).ok()?;
    parse_startup_error(&content)
}

fn parse_startup_error(content: &str) -> Option<String> {
    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;
    let errors: Vec<&str> = content[start_pos..]
        .lines()
        .filter(|line| line.contains("ERROR") || line.contains("Failed to start"))
        .collect();

    if errors.is_empty() {
        return None;
    }

    let messages: Vec<&str> = errors
        .iter()
        .map(|line| line.split_once(": ").map_or(*line, |(_, msg)| msg))
        .collect();
    Some(messages.join("\n"))
}

/// Replace a connection error with the daemon's startup error, if it logged one.
pub fn wrap_with_startup_error(err: ClientError) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }
    match read_startup_error() {
        Some(startup_error) => ClientError::DaemonStartFailed(startup_error),
        None => err,
    }
}

/// Probe whether a Unix socket is accepting connections.
pub fn probe_socket(socket_path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Remove the socket (and PID file) left behind by a daemon that is gone.
pub fn cleanup_stale_socket() -> Result<(), ClientError> {
    let dir = daemon_dir()?;
    let socket_path = dir.join("daemon.sock");
    let pid_path = dir.join("daemon.pid");

    let owner_alive = read_daemon_pid()?.is_some_and(process_exists);
    if !owner_alive {
        let _ = std::fs::remove_file(&socket_path);
        let _ = std::fs::remove_file(&pid_path);
    }
    Ok(())
}

/// Stop the daemon (graceful first, then forceful).
/// Returns true if daemon was stopped, false if it wasn't running.
pub async fn daemon_stop() -> Result<bool, ClientError> {
    let client = match crate::client::DaemonClient::connect() {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => {
            cleanup_stale_pid(&daemon_dir()?);
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let timeout = crate::client::timeout_exit();
    let shutdown_result = client.shutdown().await;

    if let Some(pid) = read_daemon_pid()? {
        if shutdown_result.is_ok() {
            wait_for_exit(pid, timeout).await;
        }
        if process_exists(pid) {
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout).await;
        }
    } else if let Err(e) = shutdown_result {
        if !e.is_retryable() {
            return Err(e);
        }
        cleanup_stale_socket()?;
        return Ok(false);
    }

    cleanup_stale_pid(&daemon_dir()?);
    Ok(true)
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
