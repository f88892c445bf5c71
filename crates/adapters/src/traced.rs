// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability

use crate::sandbox::{ExecOutput, Language, SandboxAdapter, SandboxError};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Wrapper that adds tracing to any SandboxAdapter
#[derive(Clone)]
pub struct TracedSandbox<S> {
    inner: S,
}

impl<S> TracedSandbox<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: SandboxAdapter> SandboxAdapter for TracedSandbox<S> {
    async fn provision(&self, name: &str, cols: u16, rows: u16) -> Result<String, SandboxError> {
        async {
            tracing::info!(cols, rows, "starting");
            let start = Instant::now();
            let result = self.inner.provision(name, cols, rows).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(id) => tracing::info!(sandbox_id = id.as_str(), elapsed_ms, "sandbox provisioned"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "provision failed"),
            }
            result
        }
        .instrument(tracing::info_span!("sandbox.provision", name))
        .await
    }

    async fn release(&self, id: &str) -> Result<(), SandboxError> {
        let result = self.inner.release(id).await;
        tracing::info_span!("sandbox.release", id).in_scope(|| match &result {
            Ok(()) => tracing::info!("released"),
            Err(e) => tracing::warn!(error = %e, "release failed"),
        });
        result
    }

    async fn send_input(&self, id: &str, data: &str) -> Result<(), SandboxError> {
        tracing::info_span!("sandbox.input", id)
            .in_scope(|| tracing::debug!(input_len = data.len(), "sending"));
        let result = self.inner.send_input(id, data).await;
        if let Err(ref e) = result {
            tracing::error!(id, error = %e, "send failed");
        }
        result
    }

    async fn resize(&self, id: &str, cols: u16, rows: u16) -> Result<(), SandboxError> {
        let result = self.inner.resize(id, cols, rows).await;
        if let Err(ref e) = result {
            tracing::error!(id, cols, rows, error = %e, "resize failed");
        }
        result
    }

    async fn execute(
        &self,
        id: &str,
        code: &str,
        language: Language,
        timeout: Duration,
    ) -> Result<ExecOutput, SandboxError> {
        async {
            tracing::info!(code_len = code.len(), timeout_ms = timeout.as_millis() as u64, "starting");
            let start = Instant::now();
            let result = self.inner.execute(id, code, language, timeout).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(out) => tracing::info!(exit_code = out.exit_code, elapsed_ms, "executed"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "execute failed"),
            }
            result
        }
        .instrument(tracing::info_span!("sandbox.execute", id, %language))
        .await
    }

    async fn capture_output(&self, id: &str, lines: u32) -> Result<String, SandboxError> {
        let result = self.inner.capture_output(id, lines).await;
        tracing::trace!(id, lines, captured_len = result.as_ref().map(|s| s.len()).ok(), "captured");
        result
    }

    async fn is_alive(&self, id: &str) -> Result<bool, SandboxError> {
        let result = self.inner.is_alive(id).await;
        tracing::trace!(id, alive = ?result.as_ref().ok(), "checked");
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
