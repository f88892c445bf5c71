// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background reaper that drives inactivity transitions.

use crate::manager::SessionManager;
use std::sync::Arc;
use sx_adapters::SandboxAdapter;
use sx_core::{Clock, IdGen};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn the periodic sweep. Abort the handle to stop it.
pub fn spawn_reaper<S, C, G>(manager: Arc<SessionManager<S, C, G>>) -> JoinHandle<()>
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    let period = manager.config().sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let report = manager.sweep().await;
            if !report.is_empty() {
                tracing::info!(
                    idled = report.idled.len(),
                    destroyed = report.destroyed.len(),
                    pruned = report.pruned.len(),
                    "reaper sweep"
                );
            }
        }
    })
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
