// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sx-core: domain types for sandboxed terminal sessions

pub mod clock;
pub mod error;
pub mod history;
pub mod id;
pub mod offline;
pub mod session;
pub mod stream;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::ErrorKind;
pub use history::{CommandHistoryEntry, CommandId};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use offline::OfflineQueueItem;
pub use session::{
    NoteId, SandboxId, Session, SessionId, SessionStatus, DEFAULT_COLS, DEFAULT_ROWS,
};
pub use stream::{StreamEvent, StreamEventKind};
