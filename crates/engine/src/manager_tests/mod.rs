// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{setup, setup_with, shell, test_config, TestContext};
use sx_adapters::{SandboxCall, SandboxError};
use sx_core::StreamEventKind;

mod execute;
mod lifecycle;
mod streaming;
mod sweep;

const MINUTE: u64 = 60;

/// Drain every event an observer has buffered, stopping at a heartbeat.
async fn buffered<C: Clock>(observer: &mut Observer<C>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = observer.recv().await {
        if event.kind == StreamEventKind::Heartbeat {
            break;
        }
        events.push(event);
    }
    events
}
