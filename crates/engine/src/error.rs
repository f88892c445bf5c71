// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the session engine

use sx_adapters::SandboxError;
use sx_core::{ErrorKind, SessionId};
use thiserror::Error;

/// Errors returned by session operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("session expired: {0}")]
    Expired(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("sandbox provision failed: {0}")]
    Provision(String),
    #[error("sandbox timed out: {0}")]
    Timeout(String),
    #[error("sandbox unreachable: {0}")]
    Transport(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub(crate) fn not_found(id: &SessionId) -> Self {
        EngineError::NotFound(id.to_string())
    }

    pub(crate) fn expired(id: &SessionId) -> Self {
        EngineError::Expired(id.to_string())
    }

    /// Wire category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::Expired(_) => ErrorKind::Expired,
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Provision(_) => ErrorKind::Provision,
            EngineError::Timeout(_) => ErrorKind::Timeout,
            EngineError::Transport(_) => ErrorKind::Transport,
            EngineError::Config(_) | EngineError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<SandboxError> for EngineError {
    fn from(e: SandboxError) -> Self {
        match e {
            SandboxError::SpawnFailed(msg) => EngineError::Provision(msg),
            SandboxError::Timeout(msg) => EngineError::Timeout(msg),
            SandboxError::NotFound(id) => EngineError::Transport(format!("sandbox {} is gone", id)),
            SandboxError::CommandFailed(msg) => EngineError::Transport(msg),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
