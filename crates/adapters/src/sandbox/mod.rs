// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandbox provider adapters

mod language;
mod tmux;

pub use language::Language;
pub use tmux::TmuxAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSandbox, FakeSandboxAdapter, SandboxCall};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from sandbox operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    #[error("sandbox not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("timed out: {0}")]
    Timeout(String),
}

/// Result of running a block of code inside a sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Combined stdout and stderr
    pub output: String,
    pub exit_code: i32,
}

/// Adapter for the external sandbox provider (tmux, etc.)
///
/// Ids returned by `provision` are opaque to callers.
#[async_trait]
pub trait SandboxAdapter: Clone + Send + Sync + 'static {
    /// Allocate a new sandbox with the given terminal size
    async fn provision(&self, name: &str, cols: u16, rows: u16) -> Result<String, SandboxError>;

    /// Release a sandbox. Releasing an unknown or already released sandbox succeeds.
    async fn release(&self, id: &str) -> Result<(), SandboxError>;

    /// Send raw keystrokes to the sandbox terminal (no key interpretation)
    async fn send_input(&self, id: &str, data: &str) -> Result<(), SandboxError>;

    /// Resize the sandbox terminal
    async fn resize(&self, id: &str, cols: u16, rows: u16) -> Result<(), SandboxError>;

    /// Run `code` with the interpreter for `language` and wait for it to finish
    async fn execute(
        &self,
        id: &str,
        code: &str,
        language: Language,
        timeout: Duration,
    ) -> Result<ExecOutput, SandboxError>;

    /// Capture the last `lines` lines of terminal output
    async fn capture_output(&self, id: &str, lines: u32) -> Result<String, SandboxError>;

    /// Check if a sandbox is alive
    async fn is_alive(&self, id: &str) -> Result<bool, SandboxError>;
}
