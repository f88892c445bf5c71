// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Offline command queue.
//!
//! Execute requests that cannot reach the daemon are kept in a durable FIFO
//! and replayed later, oldest first. Each item's id doubles as the execute
//! request id, so an item that was run but not yet removed is answered from
//! the daemon's ledger instead of running twice.

use crate::client::ClientError;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sx_core::{ErrorKind, OfflineQueueItem, SessionId};
use sx_daemon::ExecuteResult;
use sx_storage::{QueueStore, QueueStoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OfflineError {
    #[error("offline queue: {0}")]
    Store(#[from] QueueStoreError),

    #[error(transparent)]
    Rejected(ClientError),
}

/// Cancels a drain between items. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct DrainControl {
    cancelled: Arc<AtomicBool>,
}

impl DrainControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmittedItem {
    pub item: OfflineQueueItem,
    pub result: ExecuteResult,
}

/// Item the daemon refused; it has been removed from the queue.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedItem {
    pub item: OfflineQueueItem,
    pub kind: Option<ErrorKind>,
    pub message: String,
}

/// Why a drain stopped at an item that is still queued
#[derive(Debug, Clone, Serialize)]
pub struct Halt {
    pub item_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainReport {
    pub submitted: Vec<SubmittedItem>,
    pub rejected: Vec<RejectedItem>,
    pub halted: Option<Halt>,
    pub cancelled: bool,
    /// Items still queued when the drain stopped
    pub remaining: usize,
}

impl DrainReport {
    /// Every item was handled and the queue is empty
    pub fn is_complete(&self) -> bool {
        self.halted.is_none() && !self.cancelled && self.remaining == 0
    }
}

/// Queued items that now point at a session opened for a replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionBinding {
    /// The item itself was still queued
    pub item: bool,
    /// Other queued items of the same note
    pub others: usize,
}

/// Outcome of [`OfflineQueue::submit_or_enqueue`]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Submission {
    Executed {
        result: ExecuteResult,
        drain: DrainReport,
    },
    Queued {
        item: OfflineQueueItem,
        reason: String,
        drain: DrainReport,
    },
}

pub struct OfflineQueue<S> {
    store: S,
}

impl<S: QueueStore> OfflineQueue<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn pending(&self) -> Result<Vec<OfflineQueueItem>, QueueStoreError> {
        self.store.load()
    }

    pub fn len(&self) -> Result<usize, QueueStoreError> {
        Ok(self.store.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, QueueStoreError> {
        Ok(self.len()? == 0)
    }

    /// Append an item, generating its id if it has none.
    pub fn enqueue(&self, item: OfflineQueueItem) -> Result<OfflineQueueItem, QueueStoreError> {
        let item = with_id(item);
        self.store.update(|items| items.push(item.clone()))?;
        Ok(item)
    }

    /// Remove an item without submitting it. False if no item has `id`.
    pub fn discard(&self, id: &str) -> Result<bool, QueueStoreError> {
        self.store.update(|items| {
            let before = items.len();
            items.retain(|queued| queued.id != id);
            items.len() < before
        })
    }

    /// Point `item` and queued items of the same note that name no session
    /// at `session_id`, so retries and later items reuse it.
    pub fn bind_session(
        &self,
        item: &OfflineQueueItem,
        session_id: &SessionId,
    ) -> Result<SessionBinding, QueueStoreError> {
        self.store.update(|items| {
            let mut binding = SessionBinding::default();
            for queued in items.iter_mut().filter(|q| q.session_id.is_none()) {
                if queued.id == item.id {
                    binding.item = true;
                } else if item.note_id.is_some() && queued.note_id == item.note_id {
                    binding.others += 1;
                } else {
                    continue;
                }
                queued.session_id = Some(session_id.clone());
            }
            binding
        })
    }

    /// Remove `id`; returns how many items remain
    fn remove(&self, id: &str) -> Result<usize, QueueStoreError> {
        self.store.update(|items| {
            items.retain(|queued| queued.id != id);
            items.len()
        })
    }

    /// Replay queued items in order until the queue is empty.
    ///
    /// A retryable failure halts the drain with the item still at the head.
    /// A rejection removes the item and records it in the report. Cancel is
    /// only observed between items.
    pub async fn drain<F, Fut>(
        &self,
        control: &DrainControl,
        submit: &mut F,
    ) -> Result<DrainReport, QueueStoreError>
    where
        F: FnMut(OfflineQueueItem) -> Fut,
        Fut: Future<Output = Result<ExecuteResult, ClientError>>,
    {
        let mut report = DrainReport::default();
        loop {
            let items = self.store.load()?;
            report.remaining = items.len();
            let Some(head) = items.into_iter().next() else {
                break;
            };
            if control.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match submit(head.clone()).await {
                Ok(result) => {
                    report.remaining = self.remove(&head.id)?;
                    report.submitted.push(SubmittedItem { item: head, result });
                }
                Err(e) if e.is_retryable() => {
                    report.halted = Some(Halt {
                        item_id: head.id,
                        reason: e.to_string(),
                    });
                    break;
                }
                Err(e) => {
                    report.remaining = self.remove(&head.id)?;
                    report.rejected.push(RejectedItem {
                        item: head,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Submit a new item behind anything already queued.
    ///
    /// The queue is drained first. If it could not be emptied, or the daemon
    /// cannot be reached for the new item, the item is queued instead. A
    /// rejection of the new item is returned as an error and nothing is queued.
    pub async fn submit_or_enqueue<F, Fut>(
        &self,
        item: OfflineQueueItem,
        control: &DrainControl,
        mut submit: F,
    ) -> Result<Submission, OfflineError>
    where
        F: FnMut(OfflineQueueItem) -> Fut,
        Fut: Future<Output = Result<ExecuteResult, ClientError>>,
    {
        let item = with_id(item);
        let drain = if self.is_empty()? {
            DrainReport::default()
        } else {
            self.drain(control, &mut submit).await?
        };

        if let Some(halt) = &drain.halted {
            let reason = halt.reason.clone();
            let item = self.enqueue(item)?;
            return Ok(Submission::Queued {
                item,
                reason,
                drain,
            });
        }
        if drain.cancelled {
            let item = self.enqueue(item)?;
            return Ok(Submission::Queued {
                item,
                reason: "cancelled".to_string(),
                drain,
            });
        }

        match submit(item.clone()).await {
            Ok(result) => Ok(Submission::Executed { result, drain }),
            Err(e) if e.is_retryable() => {
                let item = self.enqueue(item)?;
                Ok(Submission::Queued {
                    item,
                    reason: e.to_string(),
                    drain,
                })
            }
            Err(e) => Err(OfflineError::Rejected(e)),
        }
    }
}

fn with_id(mut item: OfflineQueueItem) -> OfflineQueueItem {
    if item.id.is_empty() {
        item.id = uuid::Uuid::new_v4().to_string();
    }
    item
}

/// Tracks daemon reachability across probes.
///
/// [`observe`](Self::observe) is true exactly on an unreachable to reachable
/// transition. The daemon counts as unreachable before the first probe.
#[derive(Debug, Default)]
pub struct ReconnectTracker {
    reachable: bool,
}

impl ReconnectTracker {
    pub fn observe(&mut self, reachable: bool) -> bool {
        let reconnected = reachable && !self.reachable;
        self.reachable = reachable;
        reconnected
    }
}

#[cfg(test)]
#[path = "offline_tests.rs"]
mod tests;
