// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::{CreateSession, EngineConfig, ExecuteRequest, SessionManager};
use std::sync::Arc;
use std::time::Duration;
use sx_adapters::FakeSandboxAdapter;
use sx_core::{FakeClock, SequentialIdGen, Session, SessionId};

/// Convenience alias for the fully-typed test manager.
pub(crate) type TestManager = SessionManager<FakeSandboxAdapter, FakeClock, SequentialIdGen>;

/// Test context holding the manager and handles to its fakes.
pub(crate) struct TestContext {
    pub manager: Arc<TestManager>,
    pub sandbox: FakeSandboxAdapter,
    pub clock: FakeClock,
}

impl TestContext {
    pub async fn create(&self) -> Session {
        self.manager.create(CreateSession::default()).await.unwrap()
    }

    pub fn advance_secs(&self, secs: u64) {
        self.clock.advance(Duration::from_secs(secs));
    }
}

/// Config with the production thresholds and a short heartbeat.
pub(crate) fn test_config() -> EngineConfig {
    EngineConfig {
        heartbeat_interval_secs: 1,
        observer_buffer: 8,
        ..EngineConfig::default()
    }
}

pub(crate) fn setup() -> TestContext {
    setup_with(test_config())
}

pub(crate) fn setup_with(config: EngineConfig) -> TestContext {
    let sandbox = FakeSandboxAdapter::new();
    let clock = FakeClock::new();
    let manager = SessionManager::new(
        config,
        sandbox.clone(),
        clock.clone(),
        SequentialIdGen::new("id"),
    )
    .unwrap();
    TestContext {
        manager: Arc::new(manager),
        sandbox,
        clock,
    }
}

/// Execute request with a shell command and no request id.
pub(crate) fn shell(session_id: &SessionId, code: &str) -> ExecuteRequest {
    ExecuteRequest {
        session_id: session_id.clone(),
        code: code.to_string(),
        language: "shell".to_string(),
        timeout_ms: None,
        request_id: None,
    }
}
