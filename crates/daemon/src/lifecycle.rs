// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use serde::Deserialize;
use sx_adapters::{TmuxAdapter, TracedSandbox};
use sx_core::{SystemClock, UuidIdGen};
use sx_engine::{EngineConfig, EngineError, SessionManager};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::env;
use crate::protocol::PROTOCOL_VERSION;

/// Session manager with the concrete adapter types (wrapped with tracing)
pub type DaemonManager = SessionManager<TracedSandbox<TmuxAdapter>, SystemClock, UuidIdGen>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/sx)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Optional tunables file
    pub config_path: PathBuf,
    /// Working directories of sandboxes
    pub sandboxes_path: PathBuf,
    pub engine: EngineConfig,
}

/// Layout of `config.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    engine: EngineConfig,
}

impl Config {
    /// Load configuration for the user-level daemon.
    pub fn load() -> Result<Self, LifecycleError> {
        Self::for_state_dir(env::state_dir()?)
    }

    /// Configuration rooted at `state_dir`: `config.toml` if present, then
    /// environment overrides.
    pub fn for_state_dir(state_dir: PathBuf) -> Result<Self, LifecycleError> {
        let config_path = state_dir.join("config.toml");
        let mut engine = read_config_file(&config_path)?.engine;
        env::apply_engine_overrides(&mut engine)?;
        engine
            .validate()
            .map_err(|e| LifecycleError::Config(e.to_string()))?;

        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            sandboxes_path: state_dir.join("sandboxes"),
            config_path,
            engine,
            state_dir,
        })
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, LifecycleError> {
    match std::fs::read_to_string(path) {
        Ok(text) => toml::from_str(&text).map_err(|e| LifecycleError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(e.into()),
    }
}

/// Daemon state during operation.
///
/// The listener is returned separately from startup to be spawned as a Listener task.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub manager: Arc<DaemonManager>,
    pub start_time: Instant,
}

/// Result of daemon startup - includes both the daemon state and the listener.
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
}

impl DaemonState {
    /// Shutdown the daemon gracefully.
    ///
    /// Every session is destroyed and its sandbox released; nothing survives
    /// a daemon restart.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        let destroyed = self.manager.shutdown().await;
        info!(destroyed, "sessions destroyed");

        for path in [
            &self.config.socket_path,
            &self.config.lock_path,
            &self.config.version_path,
        ] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Invalid config file {path}: {message}")]
    ConfigFile { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Files belong to the running daemon when the lock is taken
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory (needed for socket, lock, etc.)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races. Not truncated until held,
    // which would wipe the running daemon's PID.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Sandbox root and version file
    std::fs::create_dir_all(&config.sandboxes_path)?;
    std::fs::write(&config.version_path, PROTOCOL_VERSION)?;

    // 4. Session manager over traced tmux sandboxes
    let sandbox = TracedSandbox::new(TmuxAdapter::new(config.sandboxes_path.clone()));
    let manager = SessionManager::new(config.engine.clone(), sandbox, SystemClock, UuidIdGen)?;
    info!(
        idle_threshold_secs = config.engine.idle_threshold_secs,
        destroy_threshold_secs = config.engine.destroy_threshold_secs,
        sweep_interval_ms = config.engine.sweep_interval_ms,
        "session manager ready"
    );

    // 5. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            manager: Arc::new(manager),
            start_time: Instant::now(),
        },
        listener,
    })
}

/// Remove files a failed startup may have left behind
fn cleanup_on_failure(config: &Config) {
    for path in [&config.socket_path, &config.version_path, &config.lock_path] {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
