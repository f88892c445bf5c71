// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

/// Random prefix for this test run to avoid conflicts with parallel test runs.
static TEST_PREFIX: LazyLock<String> = LazyLock::new(|| {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    format!("t{:04x}", nanos & 0xFFFF)
});

static SANDBOX_COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_name(suffix: &str) -> String {
    let id = SANDBOX_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", *TEST_PREFIX, suffix, id)
}

fn tmux_available() -> bool {
    std::process::Command::new("tmux")
        .arg("-V")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

macro_rules! skip_without_tmux {
    () => {
        if !tmux_available() {
            eprintln!("tmux not available, skipping");
            return;
        }
    };
}

#[tokio::test]
#[serial(tmux)]
async fn provision_creates_session_and_workdir() {
    skip_without_tmux!();
    let root = tempfile::tempdir().unwrap();
    let adapter = TmuxAdapter::new(root.path());
    let name = unique_name("prov");

    let id = adapter.provision(&name, 100, 30).await.unwrap();

    assert_eq!(id, format!("sx-{}", name));
    assert!(root.path().join(&id).is_dir());
    assert!(adapter.is_alive(&id).await.unwrap());

    adapter.release(&id).await.unwrap();
    assert!(!root.path().join(&id).exists());
}

#[tokio::test]
#[serial(tmux)]
async fn release_is_idempotent() {
    skip_without_tmux!();
    let root = tempfile::tempdir().unwrap();
    let adapter = TmuxAdapter::new(root.path());
    let id = adapter.provision(&unique_name("rel"), 80, 24).await.unwrap();

    adapter.release(&id).await.unwrap();
    adapter.release(&id).await.unwrap();
    assert!(!adapter.is_alive(&id).await.unwrap());
}

#[tokio::test]
#[serial(tmux)]
async fn send_input_reaches_the_pane() {
    skip_without_tmux!();
    let root = tempfile::tempdir().unwrap();
    let adapter = TmuxAdapter::new(root.path());
    let id = adapter.provision(&unique_name("input"), 80, 24).await.unwrap();

    adapter.send_input(&id, "echo marker-$((40+2))\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let output = adapter.capture_output(&id, 20).await.unwrap();
    assert!(output.contains("marker-42"), "pane: {}", output);

    adapter.release(&id).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn execute_runs_in_sandbox_directory() {
    skip_without_tmux!();
    let root = tempfile::tempdir().unwrap();
    let adapter = TmuxAdapter::new(root.path());
    let id = adapter.provision(&unique_name("exec"), 80, 24).await.unwrap();

    let result = adapter
        .execute(&id, "pwd; exit 3", Language::Shell, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 3);
    assert!(result.output.trim().ends_with(&id), "output: {}", result.output);

    adapter.release(&id).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn execute_past_deadline_times_out() {
    skip_without_tmux!();
    let root = tempfile::tempdir().unwrap();
    let adapter = TmuxAdapter::new(root.path());
    let id = adapter.provision(&unique_name("slow"), 80, 24).await.unwrap();

    let result = adapter
        .execute(&id, "sleep 5", Language::Shell, Duration::from_millis(100))
        .await;
    assert!(matches!(result, Err(SandboxError::Timeout(_))));

    adapter.release(&id).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn operations_on_missing_sandbox_return_not_found() {
    skip_without_tmux!();
    let adapter = TmuxAdapter::new(std::env::temp_dir());

    let result = adapter.send_input("sx-missing-xyz", "hi").await;
    assert!(matches!(result, Err(SandboxError::NotFound(_))));

    let result = adapter.resize("sx-missing-xyz", 100, 40).await;
    assert!(matches!(result, Err(SandboxError::NotFound(_))));

    assert!(!adapter.is_alive("sx-missing-xyz").await.unwrap());
}
