// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal output tail.
//!
//! Watched sessions are captured periodically; whatever appeared since the
//! previous capture is published as an `output` event. The first capture of
//! a session is only a baseline so observers never get a screen dump.

use crate::manager::SessionManager;
use std::collections::HashMap;
use std::sync::Arc;
use sx_adapters::SandboxAdapter;
use sx_core::{Clock, IdGen, SessionId};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Default)]
pub(crate) struct OutputTail {
    last: HashMap<SessionId, String>,
}

impl OutputTail {
    /// Store a new capture and return the text added since the last one.
    pub(crate) fn update(&mut self, id: &SessionId, capture: String) -> Option<String> {
        let delta = match self.last.get(id) {
            Some(prev) => output_delta(prev, &capture),
            None => None,
        };
        self.last.insert(id.clone(), capture);
        delta
    }

    pub(crate) fn forget(&mut self, id: &SessionId) {
        self.last.remove(id);
    }

    pub(crate) fn is_tracking(&self, id: &SessionId) -> bool {
        self.last.contains_key(id)
    }
}

fn trimmed_lines(capture: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = capture.lines().map(|l| l.trim_end()).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Text that `next` adds on top of `prev`.
///
/// Handles the screen scrolling by some number of lines and the last line
/// growing in place (a prompt being typed into). When no overlap is found
/// the screen was redrawn and all of `next` is new.
pub(crate) fn output_delta(prev: &str, next: &str) -> Option<String> {
    let prev = trimmed_lines(prev);
    let next = trimmed_lines(next);
    if next.is_empty() || prev == next {
        return None;
    }
    let Some(&last) = prev.last() else {
        return Some(next.join("\n"));
    };

    // k = number of prev lines still visible at the top of next
    for k in (1..=prev.len().min(next.len())).rev() {
        let kept = &prev[prev.len() - k..prev.len() - 1];
        if next[..k - 1] == *kept && next[k - 1].starts_with(last) {
            let mut delta = next[k - 1][last.len()..].to_string();
            for line in &next[k..] {
                delta.push('\n');
                delta.push_str(line);
            }
            return if delta.is_empty() { None } else { Some(delta) };
        }
    }
    Some(next.join("\n"))
}

/// Spawn the background task that polls watched sessions for new output.
pub fn spawn_tail<S, C, G>(manager: Arc<SessionManager<S, C, G>>) -> JoinHandle<()>
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    let period = manager.config().tail_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let published = manager.poll_output().await;
            if published > 0 {
                tracing::trace!(published, "tail published output");
            }
        }
    })
}

#[cfg(test)]
#[path = "tail_tests.rs"]
mod tests;
