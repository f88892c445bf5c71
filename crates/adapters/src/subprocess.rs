// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{description} failed: {source}")]
    Io {
        description: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{description} timed out after {timeout_ms}ms")]
    TimedOut { description: String, timeout_ms: u64 },
}

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`. The child is
/// marked `kill_on_drop`, so an elapsed timeout also kills the process.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, RunError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(RunError::Io {
            description: description.to_string(),
            source,
        }),
        Err(_elapsed) => Err(RunError::TimedOut {
            description: description.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
