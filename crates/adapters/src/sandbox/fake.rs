// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake sandbox adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ExecOutput, Language, SandboxAdapter, SandboxError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Recorded sandbox call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxCall {
    Provision { name: String, cols: u16, rows: u16 },
    Release { id: String },
    SendInput { id: String, data: String },
    Resize { id: String, cols: u16, rows: u16 },
    Execute { id: String, code: String, language: Language },
    CaptureOutput { id: String, lines: u32 },
}

/// Fake sandbox state
#[derive(Debug, Clone)]
pub struct FakeSandbox {
    pub name: String,
    pub cols: u16,
    pub rows: u16,
    pub alive: bool,
    pub input: Vec<String>,
    /// Terminal contents, one entry per line
    pub output: Vec<String>,
}

struct FakeSandboxState {
    sandboxes: HashMap<String, FakeSandbox>,
    calls: Vec<SandboxCall>,
    next_id: u64,
    provision_error: Option<SandboxError>,
    exec_error: Option<SandboxError>,
    exec_results: HashMap<String, ExecOutput>,
    exec_delay: Option<Duration>,
}

/// Fake sandbox adapter for testing.
///
/// By default `execute` echoes the code back with exit code 0.
#[derive(Clone)]
pub struct FakeSandboxAdapter {
    inner: Arc<Mutex<FakeSandboxState>>,
}

impl Default for FakeSandboxAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeSandboxState {
                sandboxes: HashMap::new(),
                calls: Vec::new(),
                next_id: 0,
                provision_error: None,
                exec_error: None,
                exec_results: HashMap::new(),
                exec_delay: None,
            })),
        }
    }
}

impl FakeSandboxAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SandboxCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    pub fn get_sandbox(&self, id: &str) -> Option<FakeSandbox> {
        self.inner.lock().sandboxes.get(id).cloned()
    }

    /// Number of `release` calls made for `id`
    pub fn release_count(&self, id: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, SandboxCall::Release { id: rid } if rid == id))
            .count()
    }

    /// Number of `execute` calls made against any sandbox
    pub fn execute_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, SandboxCall::Execute { .. }))
            .count()
    }

    /// Make every subsequent `provision` fail with `error`
    pub fn fail_provision(&self, error: Option<SandboxError>) {
        self.inner.lock().provision_error = error;
    }

    /// Make every subsequent `execute` fail with `error`
    pub fn fail_execute(&self, error: Option<SandboxError>) {
        self.inner.lock().exec_error = error;
    }

    /// Scripted result for a specific piece of code
    pub fn set_exec_result(&self, code: &str, output: &str, exit_code: i32) {
        self.inner.lock().exec_results.insert(
            code.to_string(),
            ExecOutput {
                output: output.to_string(),
                exit_code,
            },
        );
    }

    /// Simulated execution time; longer than the call's timeout yields `Timeout`
    pub fn set_exec_delay(&self, delay: Option<Duration>) {
        self.inner.lock().exec_delay = delay;
    }

    /// Append lines to a sandbox's terminal contents
    pub fn push_output(&self, id: &str, lines: &[&str]) {
        if let Some(sandbox) = self.inner.lock().sandboxes.get_mut(id) {
            sandbox.output.extend(lines.iter().map(|l| l.to_string()));
        }
    }

    /// Mark a sandbox as dead without releasing it
    pub fn set_dead(&self, id: &str) {
        if let Some(sandbox) = self.inner.lock().sandboxes.get_mut(id) {
            sandbox.alive = false;
        }
    }
}

#[async_trait]
impl SandboxAdapter for FakeSandboxAdapter {
    async fn provision(&self, name: &str, cols: u16, rows: u16) -> Result<String, SandboxError> {
        let mut inner = self.inner.lock();

        inner.calls.push(SandboxCall::Provision {
            name: name.to_string(),
            cols,
            rows,
        });

        if let Some(err) = inner.provision_error.clone() {
            return Err(err);
        }

        inner.next_id += 1;
        let id = format!("fake-{}", inner.next_id);
        inner.sandboxes.insert(
            id.clone(),
            FakeSandbox {
                name: name.to_string(),
                cols,
                rows,
                alive: true,
                input: Vec::new(),
                output: Vec::new(),
            },
        );

        Ok(id)
    }

    async fn release(&self, id: &str) -> Result<(), SandboxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SandboxCall::Release { id: id.to_string() });
        if let Some(sandbox) = inner.sandboxes.get_mut(id) {
            sandbox.alive = false;
        }
        Ok(())
    }

    async fn send_input(&self, id: &str, data: &str) -> Result<(), SandboxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SandboxCall::SendInput {
            id: id.to_string(),
            data: data.to_string(),
        });
        match inner.sandboxes.get_mut(id) {
            Some(sandbox) if sandbox.alive => {
                sandbox.input.push(data.to_string());
                Ok(())
            }
            _ => Err(SandboxError::NotFound(id.to_string())),
        }
    }

    async fn resize(&self, id: &str, cols: u16, rows: u16) -> Result<(), SandboxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SandboxCall::Resize {
            id: id.to_string(),
            cols,
            rows,
        });
        match inner.sandboxes.get_mut(id) {
            Some(sandbox) if sandbox.alive => {
                sandbox.cols = cols;
                sandbox.rows = rows;
                Ok(())
            }
            _ => Err(SandboxError::NotFound(id.to_string())),
        }
    }

    async fn execute(
        &self,
        id: &str,
        code: &str,
        language: Language,
        timeout: Duration,
    ) -> Result<ExecOutput, SandboxError> {
        let delay = {
            let mut inner = self.inner.lock();
            inner.calls.push(SandboxCall::Execute {
                id: id.to_string(),
                code: code.to_string(),
                language,
            });
            if !inner.sandboxes.get(id).is_some_and(|s| s.alive) {
                return Err(SandboxError::NotFound(id.to_string()));
            }
            if let Some(err) = inner.exec_error.clone() {
                return Err(err);
            }
            inner.exec_delay
        };

        if let Some(delay) = delay {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(SandboxError::Timeout(format!(
                    "{} timed out after {}ms",
                    language.interpreter().0,
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(delay).await;
        }

        let inner = self.inner.lock();
        Ok(inner
            .exec_results
            .get(code)
            .cloned()
            .unwrap_or_else(|| ExecOutput {
                output: code.to_string(),
                exit_code: 0,
            }))
    }

    async fn capture_output(&self, id: &str, lines: u32) -> Result<String, SandboxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SandboxCall::CaptureOutput {
            id: id.to_string(),
            lines,
        });
        match inner.sandboxes.get(id) {
            Some(sandbox) => {
                let start = sandbox.output.len().saturating_sub(lines as usize);
                Ok(sandbox.output[start..].join("\n"))
            }
            None => Err(SandboxError::NotFound(id.to_string())),
        }
    }

    async fn is_alive(&self, id: &str) -> Result<bool, SandboxError> {
        Ok(self.inner.lock().sandboxes.get(id).is_some_and(|s| s.alive))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
