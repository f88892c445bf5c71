// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use sx_engine::EngineConfig;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: SX_STATE_DIR > XDG_STATE_HOME/sx > ~/.local/state/sx
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("SX_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("sx"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/sx"))
}

fn parse_u64(var: &str) -> Result<Option<u64>, LifecycleError> {
    match std::env::var(var) {
        Ok(s) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| LifecycleError::Config(format!("{var} must be an integer, got {s:?}"))),
        Err(_) => Ok(None),
    }
}

/// Apply SX_IDLE_THRESHOLD_SECS, SX_DESTROY_THRESHOLD_SECS and
/// SX_SWEEP_INTERVAL_MS on top of the file configuration.
pub fn apply_engine_overrides(config: &mut EngineConfig) -> Result<(), LifecycleError> {
    if let Some(secs) = parse_u64("SX_IDLE_THRESHOLD_SECS")? {
        config.idle_threshold_secs = secs;
    }
    if let Some(secs) = parse_u64("SX_DESTROY_THRESHOLD_SECS")? {
        config.destroy_threshold_secs = secs;
    }
    if let Some(ms) = parse_u64("SX_SWEEP_INTERVAL_MS")? {
        config.sweep_interval_ms = ms;
    }
    Ok(())
}
