// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error categories shared by the daemon, protocol and CLI

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a failed session operation, as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown session or command
    NotFound,
    /// Session exists but was destroyed
    Expired,
    /// Malformed arguments or invariant violation by the caller
    Validation,
    /// Sandbox could not be allocated
    Provision,
    /// Sandbox did not answer in time
    Timeout,
    /// Sandbox or daemon unreachable
    Transport,
    Internal,
}

impl ErrorKind {
    /// HTTP status for callers bridging the protocol to HTTP.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Expired => 410,
            ErrorKind::Validation => 400,
            ErrorKind::Provision => 502,
            ErrorKind::Timeout => 504,
            ErrorKind::Transport => 503,
            ErrorKind::Internal => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Expired => "expired",
            ErrorKind::Validation => "validation",
            ErrorKind::Provision => "provision",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transport => "transport",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
