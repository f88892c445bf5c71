// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable storage for the offline command queue.
//!
//! The whole queue is rewritten on every change. Writes go to a per-writer
//! temp file that is synced and then renamed over the queue file, so a crash
//! leaves either the old or the new queue, never a partial one. Every read
//! and read-modify-write holds an exclusive lock on a `.lock` sidecar, so
//! concurrent `sx` processes never drop each other's items.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use sx_core::OfflineQueueItem;
use thiserror::Error;
use tracing::warn;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum QueueStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported queue file version {0}")]
    Version(u32),
}

/// Ordered, durable list of offline items
pub trait QueueStore: Send + Sync {
    fn load(&self) -> Result<Vec<OfflineQueueItem>, QueueStoreError>;

    /// Replace the stored queue with `items`
    fn save(&self, items: &[OfflineQueueItem]) -> Result<(), QueueStoreError>;

    /// Load, apply `change` and save as one step. Concurrent updates are
    /// serialized; none is lost.
    fn update<R>(
        &self,
        change: impl FnOnce(&mut Vec<OfflineQueueItem>) -> R,
    ) -> Result<R, QueueStoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct QueueEnvelope {
    version: u32,
    saved_at: DateTime<Utc>,
    items: Vec<OfflineQueueItem>,
}

/// JSON file-backed queue store
#[derive(Debug, Clone)]
pub struct QueueFile {
    path: PathBuf,
}

impl QueueFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Block until this process holds the queue lock
    fn lock(&self) -> Result<QueueLock, QueueStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?;
        file.lock_exclusive()?;
        Ok(QueueLock(file))
    }

    /// Missing file is an empty queue. A corrupt file is moved to `.bak`
    /// and also reads as empty.
    fn read_locked(&self) -> Result<Vec<OfflineQueueItem>, QueueStoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        match serde_json::from_reader::<_, QueueEnvelope>(BufReader::new(file)) {
            Ok(envelope) if envelope.version > FORMAT_VERSION => {
                Err(QueueStoreError::Version(envelope.version))
            }
            Ok(envelope) => Ok(envelope.items),
            Err(e) => {
                let bak_path = rotate_bak_path(&self.path);
                warn!(
                    error = %e,
                    path = %self.path.display(),
                    bak = %bak_path.display(),
                    "Corrupt offline queue, moving to .bak and starting empty",
                );
                fs::rename(&self.path, &bak_path)?;
                Ok(Vec::new())
            }
        }
    }

    fn write_locked(&self, items: &[OfflineQueueItem]) -> Result<(), QueueStoreError> {
        let tmp_path = self.tmp_path();
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            let envelope = QueueEnvelope {
                version: FORMAT_VERSION,
                saved_at: Utc::now(),
                items: items.to_vec(),
            };
            serde_json::to_writer_pretty(&mut writer, &envelope)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Temp file unique to this writer
    fn tmp_path(&self) -> PathBuf {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_extension(format!("tmp.{}.{}", std::process::id(), n))
    }
}

impl QueueStore for QueueFile {
    fn load(&self) -> Result<Vec<OfflineQueueItem>, QueueStoreError> {
        let _lock = self.lock()?;
        self.read_locked()
    }

    fn save(&self, items: &[OfflineQueueItem]) -> Result<(), QueueStoreError> {
        let _lock = self.lock()?;
        self.write_locked(items)
    }

    fn update<R>(
        &self,
        change: impl FnOnce(&mut Vec<OfflineQueueItem>) -> R,
    ) -> Result<R, QueueStoreError> {
        let _lock = self.lock()?;
        let mut items = self.read_locked()?;
        let result = change(&mut items);
        self.write_locked(&items)?;
        Ok(result)
    }
}

/// Exclusive hold on the queue's `.lock` sidecar, released on drop
struct QueueLock(File);

impl Drop for QueueLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

/// In-memory queue store. Clones share the same items.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueueStore {
    items: Arc<Mutex<Vec<OfflineQueueItem>>>,
    fail_saves: Arc<Mutex<bool>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<OfflineQueueItem> {
        self.items.lock().clone()
    }

    /// Make subsequent saves fail with an IO error
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }
}

impl QueueStore for MemoryQueueStore {
    fn load(&self) -> Result<Vec<OfflineQueueItem>, QueueStoreError> {
        Ok(self.items.lock().clone())
    }

    fn save(&self, items: &[OfflineQueueItem]) -> Result<(), QueueStoreError> {
        if *self.fail_saves.lock() {
            return Err(QueueStoreError::Io(std::io::Error::other("save disabled")));
        }
        *self.items.lock() = items.to_vec();
        Ok(())
    }

    fn update<R>(
        &self,
        change: impl FnOnce(&mut Vec<OfflineQueueItem>) -> R,
    ) -> Result<R, QueueStoreError> {
        let mut items = self.items.lock();
        let mut next = items.clone();
        let result = change(&mut next);
        if *self.fail_saves.lock() {
            return Err(QueueStoreError::Io(std::io::Error::other("save disabled")));
        }
        *items = next;
        Ok(result)
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "queue_file_tests.rs"]
mod tests;
