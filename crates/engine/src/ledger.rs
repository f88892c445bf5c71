// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execute ledger: results of execute requests that reached the sandbox,
//! keyed by the client's request id, so a replayed request is answered
//! without running the code again. Failures are kept too; a timed-out
//! command must not run a second time. Bounded; the oldest results are
//! forgotten first.

use crate::manager::ExecuteOutcome;
use crate::EngineError;
use std::collections::{HashMap, VecDeque};

/// What the first run of a request produced
pub(crate) type Recorded = Result<ExecuteOutcome, EngineError>;

pub(crate) struct ExecuteLedger {
    capacity: usize,
    results: HashMap<String, Recorded>,
    order: VecDeque<String>,
}

impl ExecuteLedger {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            results: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub(crate) fn get(&self, request_id: &str) -> Option<&Recorded> {
        self.results.get(request_id)
    }

    pub(crate) fn insert(&mut self, request_id: String, outcome: Recorded) {
        if self.results.insert(request_id.clone(), outcome).is_none() {
            self.order.push_back(request_id);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.results.remove(&oldest);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
