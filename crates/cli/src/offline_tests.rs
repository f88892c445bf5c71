// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use std::future::{ready, Ready};
use sx_storage::{MemoryQueueStore, QueueFile};
use tempfile::tempdir;

fn item(code: &str) -> OfflineQueueItem {
    OfflineQueueItem::new(code, "shell", 1_000)
}

fn result_for(item: &OfflineQueueItem) -> ExecuteResult {
    ExecuteResult {
        session_id: "s-1".into(),
        command_id: format!("c-{}", item.code),
        output: item.code.clone(),
        exit_code: 0,
        duration_ms: 1,
        replayed: false,
    }
}

fn rejected(kind: ErrorKind) -> ClientError {
    ClientError::Rejected {
        kind,
        message: "refused".into(),
    }
}

/// Records submitted codes; answers per code from `failures`, success otherwise.
struct Daemon {
    seen: Vec<String>,
    failures: HashMap<String, fn() -> ClientError>,
}

impl Daemon {
    fn new() -> Self {
        Self {
            seen: Vec::new(),
            failures: HashMap::new(),
        }
    }

    fn failing(mut self, code: &str, error: fn() -> ClientError) -> Self {
        self.failures.insert(code.to_string(), error);
        self
    }

    fn submit(
        &mut self,
    ) -> impl FnMut(OfflineQueueItem) -> Ready<Result<ExecuteResult, ClientError>> + '_ {
        move |item| {
            self.seen.push(item.code.clone());
            ready(match self.failures.get(&item.code) {
                Some(error) => Err(error()),
                None => Ok(result_for(&item)),
            })
        }
    }
}

fn queue_with(codes: &[&str]) -> (OfflineQueue<MemoryQueueStore>, MemoryQueueStore) {
    let store = MemoryQueueStore::new();
    let queue = OfflineQueue::new(store.clone());
    for code in codes {
        queue.enqueue(item(code)).unwrap();
    }
    (queue, store)
}

fn codes(store: &MemoryQueueStore) -> Vec<String> {
    store.items().into_iter().map(|i| i.code).collect()
}

#[test]
fn enqueue_generates_missing_ids() {
    let (queue, store) = queue_with(&[]);

    let generated = queue.enqueue(item("a")).unwrap();
    let mut explicit = item("b");
    explicit.id = "req-7".into();
    let kept = queue.enqueue(explicit).unwrap();

    assert!(!generated.id.is_empty());
    assert_eq!(kept.id, "req-7");
    let ids: Vec<String> = store.items().into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![generated.id, "req-7".to_string()]);
}

#[test]
fn generated_ids_are_distinct() {
    let (queue, _store) = queue_with(&[]);
    let a = queue.enqueue(item("same")).unwrap();
    let b = queue.enqueue(item("same")).unwrap();
    assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn drain_submits_in_fifo_order() {
    let (queue, store) = queue_with(&["a", "b", "c"]);
    let mut daemon = Daemon::new();

    let report = queue
        .drain(&DrainControl::new(), &mut daemon.submit())
        .await
        .unwrap();

    assert_eq!(daemon.seen, vec!["a", "b", "c"]);
    assert!(report.is_complete());
    assert_eq!(report.submitted.len(), 3);
    assert_eq!(report.submitted[0].result.output, "a");
    assert!(store.items().is_empty());
}

#[tokio::test]
async fn retryable_failure_halts_and_keeps_the_item_at_the_head() {
    let (queue, store) = queue_with(&["a", "b", "c"]);
    let head_of_b = store.items()[1].id.clone();
    let mut daemon = Daemon::new().failing("b", || ClientError::DaemonNotRunning);

    let report = queue
        .drain(&DrainControl::new(), &mut daemon.submit())
        .await
        .unwrap();

    assert_eq!(daemon.seen, vec!["a", "b"]);
    assert_eq!(codes(&store), vec!["b", "c"]);
    let halt = report.halted.unwrap();
    assert_eq!(halt.item_id, head_of_b);
    assert_eq!(report.remaining, 2);

    // Resumes from the same item once the daemon is back
    let mut daemon = Daemon::new();
    let report = queue
        .drain(&DrainControl::new(), &mut daemon.submit())
        .await
        .unwrap();
    assert_eq!(daemon.seen, vec!["b", "c"]);
    assert!(report.is_complete());
}

#[yare::parameterized(
    validation = { ErrorKind::Validation },
    not_found  = { ErrorKind::NotFound },
    expired    = { ErrorKind::Expired },
    provision  = { ErrorKind::Provision },
    timeout    = { ErrorKind::Timeout },
    transport  = { ErrorKind::Transport },
)]
fn rejected_item_is_discarded_and_reported(kind: ErrorKind) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime.block_on(async {
        let (queue, store) = queue_with(&["a", "bad", "c"]);
        let mut submit = move |item: OfflineQueueItem| {
            ready(if item.code == "bad" {
                Err(rejected(kind))
            } else {
                Ok(result_for(&item))
            })
        };

        let report = queue.drain(&DrainControl::new(), &mut submit).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.submitted.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].item.code, "bad");
        assert_eq!(report.rejected[0].kind, Some(kind));
        assert!(store.items().is_empty());
    });
}

#[tokio::test]
async fn sandbox_timeout_is_reported_once_and_not_retried() {
    let (queue, store) = queue_with(&["sleep 999", "b"]);
    let mut daemon = Daemon::new().failing("sleep 999", || rejected(ErrorKind::Timeout));

    let report = queue
        .drain(&DrainControl::new(), &mut daemon.submit())
        .await
        .unwrap();
    assert!(report.halted.is_none());
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].kind, Some(ErrorKind::Timeout));
    assert!(store.items().is_empty());

    // Nothing left to replay: the timed-out code ran exactly once
    let again = queue
        .drain(&DrainControl::new(), &mut daemon.submit())
        .await
        .unwrap();
    assert!(again.submitted.is_empty() && again.rejected.is_empty());
    assert_eq!(daemon.seen, vec!["sleep 999", "b"]);
}

#[tokio::test]
async fn cancel_is_observed_between_items() {
    let (queue, store) = queue_with(&["a", "b", "c"]);
    let control = DrainControl::new();
    let canceller = control.clone();
    let mut seen = Vec::new();
    let mut submit = |item: OfflineQueueItem| {
        seen.push(item.code.clone());
        // Cancelling mid-item still lets this item finish
        canceller.cancel();
        ready(Ok(result_for(&item)))
    };

    let report = queue.drain(&control, &mut submit).await.unwrap();

    assert_eq!(seen, vec!["a"]);
    assert!(report.cancelled);
    assert_eq!(report.remaining, 2);
    assert_eq!(codes(&store), vec!["b", "c"]);
}

#[tokio::test]
async fn failed_removal_leaves_the_item_for_replay() {
    let (queue, store) = queue_with(&["a"]);
    store.set_fail_saves(true);
    let mut daemon = Daemon::new();

    let result = queue.drain(&DrainControl::new(), &mut daemon.submit()).await;

    assert!(matches!(result, Err(QueueStoreError::Io(_))));
    assert_eq!(codes(&store), vec!["a"]);
}

#[tokio::test]
async fn new_item_runs_after_the_backlog() {
    let (queue, store) = queue_with(&["a", "b"]);
    let mut daemon = Daemon::new();

    let submission = queue
        .submit_or_enqueue(item("new"), &DrainControl::new(), daemon.submit())
        .await
        .unwrap();

    match submission {
        Submission::Executed { result, drain } => {
            assert_eq!(result.output, "new");
            assert_eq!(drain.submitted.len(), 2);
        }
        other => panic!("expected execution, got {other:?}"),
    }
    assert_eq!(daemon.seen, vec!["a", "b", "new"]);
    assert!(store.items().is_empty());
}

#[tokio::test]
async fn new_item_is_queued_behind_a_halted_backlog() {
    let (queue, store) = queue_with(&["a"]);
    let mut daemon = Daemon::new().failing("a", || ClientError::DaemonNotRunning);

    let submission = queue
        .submit_or_enqueue(item("new"), &DrainControl::new(), daemon.submit())
        .await
        .unwrap();

    assert!(matches!(submission, Submission::Queued { .. }));
    // The new item was never sent ahead of the backlog
    assert_eq!(daemon.seen, vec!["a"]);
    assert_eq!(codes(&store), vec!["a", "new"]);
}

#[tokio::test]
async fn unreachable_daemon_queues_with_the_submitted_id() {
    let (queue, store) = queue_with(&[]);
    let mut sent_ids = Vec::new();
    let submit = |item: OfflineQueueItem| {
        sent_ids.push(item.id.clone());
        ready(Err(ClientError::DaemonNotRunning))
    };

    let submission = queue
        .submit_or_enqueue(item("x"), &DrainControl::new(), submit)
        .await
        .unwrap();

    let Submission::Queued { item, reason, .. } = submission else {
        panic!("expected the item to be queued");
    };
    assert_eq!(reason, "Daemon not running");
    assert_eq!(sent_ids, vec![item.id.clone()]);
    assert_eq!(store.items()[0].id, item.id);
}

#[tokio::test]
async fn rejected_new_item_is_not_queued() {
    let (queue, store) = queue_with(&[]);
    let submit = |_item: OfflineQueueItem| ready(Err(rejected(ErrorKind::Validation)));

    let err = queue
        .submit_or_enqueue(item("x"), &DrainControl::new(), submit)
        .await
        .unwrap_err();

    assert!(matches!(err, OfflineError::Rejected(_)));
    assert!(store.items().is_empty());
}

#[tokio::test]
async fn queue_survives_reopening_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.json");

    let queue = OfflineQueue::new(QueueFile::new(&path));
    queue.enqueue(item("a")).unwrap();
    queue.enqueue(item("b")).unwrap();
    drop(queue);

    let reopened = OfflineQueue::new(QueueFile::new(&path));
    let mut daemon = Daemon::new().failing("b", || ClientError::DaemonNotRunning);
    reopened
        .drain(&DrainControl::new(), &mut daemon.submit())
        .await
        .unwrap();

    let pending: Vec<String> = OfflineQueue::new(QueueFile::new(&path))
        .pending()
        .unwrap()
        .into_iter()
        .map(|i| i.code)
        .collect();
    assert_eq!(pending, vec!["b"]);
}

#[test]
fn reconnect_fires_only_on_transition_to_reachable() {
    let mut tracker = ReconnectTracker::default();
    let fired: Vec<bool> = [false, true, true, false, false, true]
        .into_iter()
        .map(|reachable| tracker.observe(reachable))
        .collect();
    assert_eq!(fired, vec![false, true, false, false, false, true]);
}

#[test]
fn first_reachable_probe_counts_as_reconnect() {
    let mut tracker = ReconnectTracker::default();
    assert!(tracker.observe(true));
}

#[test]
fn discard_removes_only_the_named_item() {
    let (queue, store) = queue_with(&["a", "b"]);
    let first = store.items()[0].id.clone();

    assert!(queue.discard(&first).unwrap());
    assert!(!queue.discard("missing").unwrap());
    assert_eq!(codes(&store), vec!["b"]);
}

#[tokio::test]
async fn item_enqueued_by_another_process_during_a_drain_is_kept() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.json");
    let draining = OfflineQueue::new(QueueFile::new(&path));
    draining.enqueue(item("a")).unwrap();
    draining.enqueue(item("b")).unwrap();

    let other = OfflineQueue::new(QueueFile::new(&path));
    let mut seen = Vec::new();
    let mut submit = |queued: OfflineQueueItem| {
        if queued.code == "a" {
            // Lands between the load of the head and its removal
            other.enqueue(item("late")).unwrap();
        }
        seen.push(queued.code.clone());
        ready(Ok::<_, ClientError>(result_for(&queued)))
    };

    let report = draining
        .drain(&DrainControl::new(), &mut submit)
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(seen, vec!["a", "b", "late"]);
}
