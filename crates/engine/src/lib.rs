// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Session engine: lifecycle, history, streaming and the reaper

mod broker;
mod config;
mod error;
mod history;
mod ledger;
mod manager;
mod reaper;
mod store;
mod tail;

#[cfg(test)]
mod test_helpers;

pub use broker::{Observer, ObserverId, StreamBroker};
pub use config::EngineConfig;
pub use error::EngineError;
pub use history::HistoryLog;
pub use manager::{
    CreateSession, ExecuteOutcome, ExecuteRequest, SessionManager, SessionStats, SweepReport,
    FAILED_EXIT_CODE, MAX_DIMENSION,
};
pub use reaper::spawn_reaper;
pub use store::{SessionCell, SessionStore};
pub use tail::spawn_tail;
