// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of time for lifecycle decisions.
///
/// Sessions store wall-clock epoch milliseconds; `now()` is available for
/// measuring elapsed durations.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    fn epoch_ms(&self) -> u64;
}

/// Real system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(Debug)]
struct FakeClockState {
    instant: Instant,
    epoch_ms: u64,
}

/// Manually advanced clock for tests. Clones share the same time.
#[derive(Clone, Debug)]
pub struct FakeClock {
    state: Arc<Mutex<FakeClockState>>,
}

impl FakeClock {
    /// Starts at a fixed, non-zero epoch so timestamps are distinguishable from defaults.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeClockState {
                instant: Instant::now(),
                epoch_ms: 1_700_000_000_000,
            })),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.instant += by;
        state.epoch_ms += by.as_millis() as u64;
    }

    pub fn set_epoch_ms(&self, ms: u64) {
        self.state.lock().epoch_ms = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().instant
    }

    fn epoch_ms(&self) -> u64 {
        self.state.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
