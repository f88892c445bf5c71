// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tunables

use crate::EngineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sx_core::{DEFAULT_COLS, DEFAULT_ROWS};

/// Lifecycle and streaming settings.
///
/// Every field has a default so a partial `[engine]` table in
/// `config.toml` is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Inactivity after which an active session becomes idle
    pub idle_threshold_secs: u64,
    /// Inactivity after which an idle session is destroyed
    pub destroy_threshold_secs: u64,
    pub sweep_interval_ms: u64,
    pub heartbeat_interval_secs: u64,
    /// Events buffered per observer before it is force-closed
    pub observer_buffer: usize,
    /// History entries kept per session (oldest evicted first)
    pub history_limit: usize,
    /// How long destroyed sessions stay queryable
    pub tombstone_ttl_secs: u64,
    pub default_exec_timeout_ms: u64,
    pub max_exec_timeout_ms: u64,
    /// Execute results remembered for request-id deduplication
    pub ledger_capacity: usize,
    pub tail_interval_ms: u64,
    pub tail_lines: u32,
    pub default_cols: u16,
    pub default_rows: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_threshold_secs: 15 * 60,
            destroy_threshold_secs: 30 * 60,
            sweep_interval_ms: 60_000,
            heartbeat_interval_secs: 30,
            observer_buffer: 256,
            history_limit: 500,
            tombstone_ttl_secs: 60 * 60,
            default_exec_timeout_ms: 30_000,
            max_exec_timeout_ms: 300_000,
            ledger_capacity: 1024,
            tail_interval_ms: 500,
            tail_lines: 200,
            default_cols: DEFAULT_COLS,
            default_rows: DEFAULT_ROWS,
        }
    }
}

impl EngineConfig {
    /// Check cross-field invariants. The daemon refuses to start on error.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.idle_threshold_secs >= self.destroy_threshold_secs {
            return Err(EngineError::Config(format!(
                "idle threshold ({}s) must be less than destroy threshold ({}s)",
                self.idle_threshold_secs, self.destroy_threshold_secs
            )));
        }
        if self.sweep_interval_ms == 0 || self.tail_interval_ms == 0 {
            return Err(EngineError::Config("intervals must be non-zero".into()));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(EngineError::Config("heartbeat interval must be non-zero".into()));
        }
        if self.observer_buffer < 2 {
            return Err(EngineError::Config("observer buffer must hold at least 2 events".into()));
        }
        if self.history_limit == 0 || self.ledger_capacity == 0 {
            return Err(EngineError::Config("history and ledger limits must be non-zero".into()));
        }
        if self.default_exec_timeout_ms == 0
            || self.default_exec_timeout_ms > self.max_exec_timeout_ms
        {
            return Err(EngineError::Config(format!(
                "default exec timeout ({}ms) must be between 1 and max ({}ms)",
                self.default_exec_timeout_ms, self.max_exec_timeout_ms
            )));
        }
        if self.default_cols == 0 || self.default_rows == 0 {
            return Err(EngineError::Config("default terminal size must be non-zero".into()));
        }
        Ok(())
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs)
    }

    pub fn destroy_threshold(&self) -> Duration {
        Duration::from_secs(self.destroy_threshold_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn tombstone_ttl(&self) -> Duration {
        Duration::from_secs(self.tombstone_ttl_secs)
    }

    pub fn tail_interval(&self) -> Duration {
        Duration::from_millis(self.tail_interval_ms)
    }

    pub(crate) fn destroy_after_ms(&self) -> u64 {
        self.destroy_threshold_secs.saturating_mul(1000)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
