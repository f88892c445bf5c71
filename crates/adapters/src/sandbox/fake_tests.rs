// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const SECOND: Duration = Duration::from_secs(1);

#[tokio::test]
async fn provision_records_call_and_size() {
    let adapter = FakeSandboxAdapter::new();
    let id = adapter.provision("s-1", 120, 40).await.unwrap();

    let sandbox = adapter.get_sandbox(&id).unwrap();
    assert_eq!((sandbox.cols, sandbox.rows), (120, 40));
    assert!(sandbox.alive);
    assert_eq!(
        adapter.calls(),
        vec![SandboxCall::Provision {
            name: "s-1".to_string(),
            cols: 120,
            rows: 40
        }]
    );
}

#[tokio::test]
async fn provision_failure_is_configurable() {
    let adapter = FakeSandboxAdapter::new();
    adapter.fail_provision(Some(SandboxError::SpawnFailed("quota".into())));
    let result = adapter.provision("s-1", 80, 24).await;
    assert!(matches!(result, Err(SandboxError::SpawnFailed(_))));
}

#[tokio::test]
async fn release_kills_and_counts() {
    let adapter = FakeSandboxAdapter::new();
    let id = adapter.provision("s-1", 80, 24).await.unwrap();

    adapter.release(&id).await.unwrap();
    adapter.release(&id).await.unwrap();

    assert!(!adapter.is_alive(&id).await.unwrap());
    assert_eq!(adapter.release_count(&id), 2);
}

#[tokio::test]
async fn input_after_release_is_not_found() {
    let adapter = FakeSandboxAdapter::new();
    let id = adapter.provision("s-1", 80, 24).await.unwrap();
    adapter.send_input(&id, "ls\n").await.unwrap();
    adapter.release(&id).await.unwrap();

    let result = adapter.send_input(&id, "ls\n").await;
    assert!(matches!(result, Err(SandboxError::NotFound(_))));
    assert_eq!(adapter.get_sandbox(&id).unwrap().input, vec!["ls\n"]);
}

#[tokio::test]
async fn execute_echoes_by_default_and_uses_scripted_results() {
    let adapter = FakeSandboxAdapter::new();
    let id = adapter.provision("s-1", 80, 24).await.unwrap();

    let out = adapter
        .execute(&id, "print(1)", Language::Python, SECOND)
        .await
        .unwrap();
    assert_eq!(out.output, "print(1)");
    assert_eq!(out.exit_code, 0);

    adapter.set_exec_result("exit 2", "boom", 2);
    let out = adapter
        .execute(&id, "exit 2", Language::Shell, SECOND)
        .await
        .unwrap();
    assert_eq!(out, ExecOutput { output: "boom".into(), exit_code: 2 });
    assert_eq!(adapter.execute_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_execute_times_out() {
    let adapter = FakeSandboxAdapter::new();
    let id = adapter.provision("s-1", 80, 24).await.unwrap();
    adapter.set_exec_delay(Some(Duration::from_secs(10)));

    let result = adapter
        .execute(&id, "sleep", Language::Shell, Duration::from_millis(50))
        .await;
    assert!(matches!(result, Err(SandboxError::Timeout(_))));
}

#[tokio::test]
async fn capture_returns_tail_lines() {
    let adapter = FakeSandboxAdapter::new();
    let id = adapter.provision("s-1", 80, 24).await.unwrap();
    adapter.push_output(&id, &["a", "b", "c"]);

    assert_eq!(adapter.capture_output(&id, 2).await.unwrap(), "b\nc");
    assert!(adapter.capture_output("nope", 2).await.is_err());
}
