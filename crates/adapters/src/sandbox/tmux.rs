// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux sandbox adapter
//!
//! Each sandbox is a detached tmux session rooted in its own working
//! directory under `root`. Interactive input goes to the pane; `execute`
//! runs the interpreter as a child process in the pane's current directory
//! so code sees the same filesystem state the user has built up.

use super::{ExecOutput, Language, SandboxAdapter, SandboxError};
use crate::env;
use crate::subprocess::{run_with_timeout, RunError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Tmux-based sandbox adapter
#[derive(Clone, Debug)]
pub struct TmuxAdapter {
    root: PathBuf,
}

impl TmuxAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn workdir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }
}

#[async_trait]
impl SandboxAdapter for TmuxAdapter {
    async fn provision(&self, name: &str, cols: u16, rows: u16) -> Result<String, SandboxError> {
        let sandbox_id = format!("{}-{}", env::tmux_prefix(), name);
        let cwd = self.workdir(&sandbox_id);
        tokio::fs::create_dir_all(&cwd).await.map_err(|e| {
            SandboxError::SpawnFailed(format!("cannot create {}: {}", cwd.display(), e))
        })?;

        // A leftover session with the same name belongs to nobody now
        let mut cmd_has = Command::new("tmux");
        cmd_has.args(["has-session", "-t", &sandbox_id]);
        let existing = run_with_timeout(cmd_has, env::tmux_timeout(), "tmux has-session").await;
        if existing.map(|o| o.status.success()).unwrap_or(false) {
            tracing::warn!(sandbox_id, "sandbox already exists, killing first");
            kill_session(&sandbox_id).await;
        }

        let mut tmux_cmd = Command::new("tmux");
        tmux_cmd
            .args(["new-session", "-d", "-s", &sandbox_id])
            .args(["-x", &cols.to_string(), "-y", &rows.to_string()])
            .arg("-c")
            .arg(&cwd);

        let output = run_with_timeout(tmux_cmd, env::tmux_timeout(), "tmux new-session")
            .await
            .map_err(|e| SandboxError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(sandbox_id, stderr = %stderr, "tmux new-session failed");
            return Err(SandboxError::SpawnFailed(stderr.trim().to_string()));
        }

        Ok(sandbox_id)
    }

    async fn release(&self, id: &str) -> Result<(), SandboxError> {
        kill_session(id).await;
        match tokio::fs::remove_dir_all(self.workdir(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(sandbox_id = id, error = %e, "failed to remove workdir"),
        }
        Ok(())
    }

    async fn send_input(&self, id: &str, data: &str) -> Result<(), SandboxError> {
        // -l = literal mode, -- = end of options (data may start with -)
        tmux_output(&["send-keys", "-t", id, "-l", "--", data], "tmux send-keys")
            .await
            .map(|_| ())
    }

    async fn resize(&self, id: &str, cols: u16, rows: u16) -> Result<(), SandboxError> {
        let (cols, rows) = (cols.to_string(), rows.to_string());
        tmux_output(
            &["resize-window", "-t", id, "-x", &cols, "-y", &rows],
            "tmux resize-window",
        )
        .await
        .map(|_| ())
    }

    async fn execute(
        &self,
        id: &str,
        code: &str,
        language: Language,
        timeout: Duration,
    ) -> Result<ExecOutput, SandboxError> {
        let cwd = pane_cwd(id).await.unwrap_or_else(|| self.workdir(id));

        let (program, flag) = language.interpreter();
        let mut cmd = Command::new(program);
        cmd.arg(flag).arg(code).current_dir(&cwd);

        let output = run_with_timeout(cmd, timeout, program)
            .await
            .map_err(|e| match e {
                RunError::TimedOut { .. } => SandboxError::Timeout(e.to_string()),
                RunError::Io { .. } => SandboxError::CommandFailed(e.to_string()),
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        // Killed by a signal has no exit code
        let exit_code = output.status.code().unwrap_or(-1);
        Ok(ExecOutput {
            output: text,
            exit_code,
        })
    }

    async fn capture_output(&self, id: &str, lines: u32) -> Result<String, SandboxError> {
        let start = format!("-{}", lines);
        let output = tmux_output(
            &["capture-pane", "-t", id, "-p", "-S", &start],
            "tmux capture-pane",
        )
        .await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn is_alive(&self, id: &str) -> Result<bool, SandboxError> {
        let mut cmd = Command::new("tmux");
        cmd.args(["has-session", "-t", id]);
        let output = run_with_timeout(cmd, env::tmux_timeout(), "tmux has-session")
            .await
            .map_err(|e| SandboxError::CommandFailed(e.to_string()))?;
        Ok(output.status.success())
    }
}

/// Kill a tmux session, ignoring failure (it may already be gone).
async fn kill_session(id: &str) {
    let mut cmd = Command::new("tmux");
    cmd.args(["kill-session", "-t", id]);
    let _ = run_with_timeout(cmd, env::tmux_timeout(), "tmux kill-session").await;
}

/// Current directory of the sandbox pane, if tmux can report it.
async fn pane_cwd(id: &str) -> Option<PathBuf> {
    let output = tmux_output(
        &["display-message", "-t", id, "-p", "#{pane_current_path}"],
        "tmux display-message",
    )
    .await
    .ok()?;
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if path.is_empty() || !Path::new(&path).is_dir() {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Run a tmux command and return the output, returning `NotFound` on failure.
async fn tmux_output(
    args: &[&str],
    description: &str,
) -> Result<std::process::Output, SandboxError> {
    let mut cmd = Command::new("tmux");
    cmd.args(args);
    let output = run_with_timeout(cmd, env::tmux_timeout(), description)
        .await
        .map_err(|e| match e {
            RunError::TimedOut { .. } => SandboxError::Timeout(e.to_string()),
            RunError::Io { .. } => SandboxError::CommandFailed(e.to_string()),
        })?;
    if !output.status.success() {
        let sandbox_id = args
            .windows(2)
            .find(|w| w[0] == "-t")
            .map(|w| w[1])
            .unwrap_or("unknown");
        return Err(SandboxError::NotFound(sandbox_id.to_string()));
    }
    Ok(output)
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
