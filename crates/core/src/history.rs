// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command history entries

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier of a submitted command, unique within its session.
    pub struct CommandId;
}

/// One command submitted to a session.
///
/// `exit_code` and `duration_ms` are filled together when the command
/// completes and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandHistoryEntry {
    pub command_id: CommandId,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl CommandHistoryEntry {
    pub fn pending(command_id: CommandId, command: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            command_id,
            command: command.into(),
            language: None,
            timestamp_ms,
            exit_code: None,
            duration_ms: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn is_complete(&self) -> bool {
        self.exit_code.is_some()
    }

    /// Fill the terminal fields. Returns false if they were already set.
    pub fn complete(&mut self, exit_code: i32, duration_ms: u64) -> bool {
        if self.is_complete() {
            return false;
        }
        self.exit_code = Some(exit_code);
        self.duration_ms = Some(duration_ms);
        true
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
