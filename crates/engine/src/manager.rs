// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle manager.
//!
//! Owns the authoritative session records and drives the
//! `active ⇄ idle → destroyed` state machine. Every client operation goes
//! through here: it counts as activity, is serialized per session, and is
//! then delegated to the sandbox adapter.

use crate::broker::{Observer, ObserverId, StreamBroker};
use crate::config::EngineConfig;
use crate::history::HistoryLog;
use crate::ledger::ExecuteLedger;
use crate::store::{SessionCell, SessionStore};
use crate::tail::OutputTail;
use crate::EngineError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sx_adapters::{Language, SandboxAdapter, SandboxError};
use sx_core::{
    Clock, CommandHistoryEntry, CommandId, IdGen, NoteId, SandboxId, Session, SessionId,
    SessionStatus, StreamEvent, UuidIdGen,
};

/// Largest accepted terminal dimension
pub const MAX_DIMENSION: i64 = 1000;

/// Exit code recorded for commands that never produced one
pub const FAILED_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSession {
    pub owner: Option<String>,
    pub note_id: Option<NoteId>,
    pub cols: Option<u16>,
    pub rows: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteRequest {
    pub session_id: SessionId,
    pub code: String,
    pub language: String,
    pub timeout_ms: Option<u64>,
    /// Idempotency key; a repeated key returns the first result
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOutcome {
    pub session_id: SessionId,
    pub command_id: CommandId,
    pub output: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    /// True when answered from the ledger without running again
    pub replayed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub idle_sessions: usize,
    /// Destroyed sessions whose tombstones are still retained
    pub destroyed_sessions: usize,
    pub total_created: u64,
    pub total_destroyed: u64,
}

/// What one reaper pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub idled: Vec<SessionId>,
    pub destroyed: Vec<SessionId>,
    pub pruned: Vec<SessionId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.idled.is_empty() && self.destroyed.is_empty() && self.pruned.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum DestroyReason {
    Requested,
    Expired,
    Shutdown,
}

impl DestroyReason {
    fn as_str(self) -> &'static str {
        match self {
            DestroyReason::Requested => "requested",
            DestroyReason::Expired => "expired",
            DestroyReason::Shutdown => "shutdown",
        }
    }
}

pub struct SessionManager<S, C: Clock, G = UuidIdGen> {
    config: EngineConfig,
    sandbox: S,
    clock: C,
    ids: G,
    store: Arc<SessionStore>,
    history: HistoryLog<C>,
    broker: StreamBroker<C>,
    ledger: Mutex<ExecuteLedger>,
    tail: Mutex<OutputTail>,
    total_created: AtomicU64,
    total_destroyed: AtomicU64,
    closing: AtomicBool,
}

impl<S, C, G> SessionManager<S, C, G>
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
{
    /// Build a manager. Fails if the configuration is inconsistent.
    pub fn new(config: EngineConfig, sandbox: S, clock: C, ids: G) -> Result<Self, EngineError> {
        config.validate()?;
        let store = Arc::new(SessionStore::new());
        Ok(Self {
            history: HistoryLog::new(Arc::clone(&store), clock.clone(), config.history_limit),
            broker: StreamBroker::new(Arc::clone(&store), clock.clone(), &config),
            ledger: Mutex::new(ExecuteLedger::new(config.ledger_capacity)),
            tail: Mutex::new(OutputTail::default()),
            total_created: AtomicU64::new(0),
            total_destroyed: AtomicU64::new(0),
            closing: AtomicBool::new(false),
            config,
            sandbox,
            clock,
            ids,
            store,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sandbox(&self) -> &S {
        &self.sandbox
    }

    pub fn broker(&self) -> &StreamBroker<C> {
        &self.broker
    }

    pub fn history_log(&self) -> &HistoryLog<C> {
        &self.history
    }

    // ── Lookup helpers ──────────────────────────────────────────────────

    fn cell(&self, id: &SessionId) -> Result<Arc<SessionCell>, EngineError> {
        self.store.get(id).ok_or_else(|| EngineError::not_found(id))
    }

    fn live_cell(&self, id: &SessionId) -> Result<Arc<SessionCell>, EngineError> {
        let cell = self.cell(id)?;
        if cell.status().is_terminal() {
            return Err(EngineError::expired(id));
        }
        Ok(cell)
    }

    /// Record activity on a cell and wake it if idle.
    fn touch_cell(&self, cell: &SessionCell) -> Result<Session, EngineError> {
        let now = self.clock.epoch_ms();
        let (session, woke) = {
            let mut record = cell.record.lock();
            if record.is_destroyed() {
                return Err(EngineError::expired(cell.id()));
            }
            let woke = record.status == SessionStatus::Idle;
            record.touch(now, self.config.destroy_after_ms());
            (record.clone(), woke)
        };
        if woke {
            tracing::debug!(session_id = %cell.id(), "session active again");
            self.broker
                .publish_to(cell, &StreamEvent::status(&session, now));
        }
        Ok(session)
    }

    /// A sandbox failure on a session destroyed meanwhile reads as expired.
    fn sandbox_error(&self, cell: &SessionCell, e: SandboxError) -> EngineError {
        if cell.status().is_terminal() {
            EngineError::expired(cell.id())
        } else {
            e.into()
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Allocate a session and provision its sandbox.
    pub async fn create(&self, request: CreateSession) -> Result<Session, EngineError> {
        if self.closing.load(Ordering::Acquire) {
            return Err(EngineError::Transport("daemon is shutting down".into()));
        }
        let cols = request.cols.unwrap_or(self.config.default_cols);
        let rows = request.rows.unwrap_or(self.config.default_rows);
        dimension("cols", i64::from(cols))?;
        dimension("rows", i64::from(rows))?;

        let session_id = SessionId::new(self.ids.next());
        let sandbox_id = self
            .sandbox
            .provision(session_id.as_str(), cols, rows)
            .await
            .map_err(|e| EngineError::Provision(e.to_string()))?;

        let now = self.clock.epoch_ms();
        let session = Session::new(
            session_id,
            SandboxId::new(sandbox_id),
            now,
            self.config.destroy_after_ms(),
        )
        .with_owner(request.owner)
        .with_note(request.note_id)
        .with_size(cols, rows);

        self.store.insert(session.clone());
        self.total_created.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            session_id = %session.session_id,
            sandbox_id = %session.sandbox_id,
            owner = session.owner.as_deref().unwrap_or(""),
            "session created"
        );
        Ok(session)
    }

    /// Mark activity. Idle sessions become active again.
    pub fn touch(&self, id: &SessionId) -> Result<Session, EngineError> {
        let cell = self.cell(id)?;
        self.touch_cell(&cell)
    }

    /// Current view of a session without counting as activity.
    ///
    /// Destroyed sessions are reported until their tombstone is pruned.
    pub fn status(&self, id: &SessionId) -> Result<Session, EngineError> {
        Ok(self.cell(id)?.session())
    }

    /// All live sessions, oldest first
    pub fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .store
            .cells()
            .iter()
            .map(|cell| cell.session())
            .filter(|s| !s.is_destroyed())
            .collect();
        sessions.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        sessions
    }

    /// Destroy a session and release its sandbox.
    ///
    /// Returns false if it was already destroyed (a successful no-op).
    pub async fn destroy(&self, id: &SessionId) -> Result<bool, EngineError> {
        let cell = self.cell(id)?;
        Ok(self
            .destroy_cell(&cell, DestroyReason::Requested, |_| true)
            .await)
    }

    /// Take the destroyed transition if `guard` still holds, then release.
    ///
    /// The transition happens under the record lock, so exactly one caller
    /// wins it and releases the sandbox.
    async fn destroy_cell<F>(&self, cell: &SessionCell, reason: DestroyReason, guard: F) -> bool
    where
        F: FnOnce(&Session) -> bool,
    {
        let now = self.clock.epoch_ms();
        let session = {
            let mut record = cell.record.lock();
            if !guard(&record) || !record.transition(SessionStatus::Destroyed, now) {
                return false;
            }
            record.clone()
        };
        self.total_destroyed.fetch_add(1, Ordering::Relaxed);

        let closed = self
            .broker
            .close_session(cell, &StreamEvent::status(&session, now));
        self.tail.lock().forget(cell.id());

        if let Err(e) = self.sandbox.release(session.sandbox_id.as_str()).await {
            tracing::warn!(
                session_id = %session.session_id,
                sandbox_id = %session.sandbox_id,
                error = %e,
                "sandbox release failed"
            );
        }
        tracing::info!(
            session_id = %session.session_id,
            reason = reason.as_str(),
            observers = closed,
            "session destroyed"
        );
        true
    }

    /// One reaper pass: demote inactive sessions, destroy long-idle ones,
    /// and prune tombstones past their retention.
    pub async fn sweep(&self) -> SweepReport {
        enum Step {
            Idled(Session),
            Destroy,
            Prune,
            Keep,
        }

        let now = self.clock.epoch_ms();
        let idle_ms = self.config.idle_threshold_secs.saturating_mul(1000);
        let destroy_ms = self.config.destroy_after_ms();
        let ttl_ms = self.config.tombstone_ttl_secs.saturating_mul(1000);
        let mut report = SweepReport::default();

        for cell in self.store.cells() {
            let step = {
                let mut record = cell.record.lock();
                let inactive = record.inactive_for_ms(now);
                match record.status {
                    SessionStatus::Active if inactive > idle_ms => {
                        record.transition(SessionStatus::Idle, now);
                        Step::Idled(record.clone())
                    }
                    SessionStatus::Idle if inactive > destroy_ms => Step::Destroy,
                    SessionStatus::Destroyed
                        if now.saturating_sub(record.expires_at_ms) > ttl_ms =>
                    {
                        Step::Prune
                    }
                    _ => Step::Keep,
                }
            };

            match step {
                Step::Idled(session) => {
                    tracing::info!(session_id = %cell.id(), "session idle");
                    self.broker
                        .publish_to(&cell, &StreamEvent::status(&session, now));
                    report.idled.push(cell.id().clone());
                }
                Step::Destroy => {
                    // Re-checked under the lock: a touch since may have revived it
                    let still_idle = |s: &Session| {
                        s.status == SessionStatus::Idle && s.inactive_for_ms(now) > destroy_ms
                    };
                    if self
                        .destroy_cell(&cell, DestroyReason::Expired, still_idle)
                        .await
                    {
                        report.destroyed.push(cell.id().clone());
                    }
                }
                Step::Prune => {
                    self.store.remove(cell.id());
                    tracing::debug!(session_id = %cell.id(), "tombstone pruned");
                    report.pruned.push(cell.id().clone());
                }
                Step::Keep => {}
            }
        }

        report
    }

    pub fn stats(&self) -> SessionStats {
        let mut stats = SessionStats {
            total_created: self.total_created.load(Ordering::Relaxed),
            total_destroyed: self.total_destroyed.load(Ordering::Relaxed),
            ..SessionStats::default()
        };
        for cell in self.store.cells() {
            match cell.status() {
                SessionStatus::Active => stats.active_sessions += 1,
                SessionStatus::Idle => stats.idle_sessions += 1,
                SessionStatus::Destroyed => stats.destroyed_sessions += 1,
            }
        }
        stats
    }

    /// Refuse new sessions and destroy every live one.
    pub async fn shutdown(&self) -> usize {
        self.closing.store(true, Ordering::Release);
        let mut destroyed = 0;
        for cell in self.store.cells() {
            if self
                .destroy_cell(&cell, DestroyReason::Shutdown, |_| true)
                .await
            {
                destroyed += 1;
            }
        }
        destroyed
    }

    // ── Session operations ──────────────────────────────────────────────

    /// Forward raw keystrokes to the session terminal.
    pub async fn input(&self, id: &SessionId, data: &str) -> Result<(), EngineError> {
        let cell = self.live_cell(id)?;
        if data.is_empty() {
            return Err(EngineError::Validation("input is empty".into()));
        }

        let _ops = cell.ops.lock().await;
        let session = self.touch_cell(&cell)?;
        self.sandbox
            .send_input(session.sandbox_id.as_str(), data)
            .await
            .map_err(|e| self.sandbox_error(&cell, e))
    }

    /// Resize the session terminal. Arguments are validated before any
    /// state changes.
    pub async fn resize(&self, id: &SessionId, cols: i64, rows: i64) -> Result<Session, EngineError> {
        let cell = self.live_cell(id)?;
        let cols = dimension("cols", cols)?;
        let rows = dimension("rows", rows)?;

        let _ops = cell.ops.lock().await;
        let session = self.touch_cell(&cell)?;
        self.sandbox
            .resize(session.sandbox_id.as_str(), cols, rows)
            .await
            .map_err(|e| self.sandbox_error(&cell, e))?;

        let mut record = cell.record.lock();
        if !record.is_destroyed() {
            record.cols = cols;
            record.rows = rows;
        }
        Ok(record.clone())
    }

    /// Run code in the session sandbox and record it in history.
    ///
    /// A request id already in the ledger is answered with the recorded
    /// result, success or failure, instead of running again.
    pub async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteOutcome, EngineError> {
        if let Some(recorded) = self.replayed(&request) {
            return recorded;
        }

        let cell = self.live_cell(&request.session_id)?;
        let language: Language = request.language.parse().map_err(EngineError::Validation)?;
        if request.code.trim().is_empty() {
            return Err(EngineError::Validation("code is empty".into()));
        }
        let timeout = self.exec_timeout(request.timeout_ms)?;

        let _ops = cell.ops.lock().await;
        // A concurrent duplicate may have finished while we waited
        if let Some(recorded) = self.replayed(&request) {
            return recorded;
        }
        let session = self.touch_cell(&cell)?;
        let session_id = session.session_id.clone();

        let command_id = CommandId::new(self.ids.next());
        self.history.record(
            &session_id,
            command_id.clone(),
            &request.code,
            Some(language.as_str()),
        )?;

        let started = self.clock.now();
        let result = self
            .sandbox
            .execute(session.sandbox_id.as_str(), &request.code, language, timeout)
            .await;
        let duration_ms = self.clock.now().saturating_duration_since(started).as_millis() as u64;
        let now = self.clock.epoch_ms();

        match result {
            Ok(out) => {
                if let Err(e) = self
                    .history
                    .complete(&session_id, &command_id, out.exit_code, duration_ms)
                {
                    tracing::warn!(%session_id, %command_id, error = %e, "history completion failed");
                }
                let status = self
                    .touch_cell(&cell)
                    .map(|s| s.status)
                    .unwrap_or(SessionStatus::Destroyed);
                if !out.output.is_empty() {
                    self.broker
                        .publish_to(&cell, &StreamEvent::output(out.output.clone(), now));
                }
                self.broker.publish_to(
                    &cell,
                    &StreamEvent::completion(
                        status,
                        command_id.as_str(),
                        out.exit_code,
                        duration_ms,
                        now,
                    ),
                );

                let outcome = ExecuteOutcome {
                    session_id,
                    command_id,
                    output: out.output,
                    exit_code: out.exit_code,
                    duration_ms,
                    replayed: false,
                };
                self.remember(&request, Ok(outcome.clone()));
                Ok(outcome)
            }
            Err(e) => {
                if let Err(e) = self.history.complete(
                    &session_id,
                    &command_id,
                    FAILED_EXIT_CODE,
                    duration_ms,
                ) {
                    tracing::warn!(%session_id, %command_id, error = %e, "history completion failed");
                }
                let err = self.sandbox_error(&cell, e);
                self.broker
                    .publish_to(&cell, &StreamEvent::error(err.to_string(), now));
                self.remember(&request, Err(err.clone()));
                Err(err)
            }
        }
    }

    fn remember(&self, request: &ExecuteRequest, recorded: Result<ExecuteOutcome, EngineError>) {
        if let Some(request_id) = &request.request_id {
            self.ledger.lock().insert(request_id.clone(), recorded);
        }
    }

    fn replayed(&self, request: &ExecuteRequest) -> Option<Result<ExecuteOutcome, EngineError>> {
        let request_id = request.request_id.as_deref()?;
        let recorded = self.ledger.lock().get(request_id).cloned()?;
        tracing::info!(
            request_id,
            session_id = %request.session_id,
            ok = recorded.is_ok(),
            "replayed execute answered from ledger"
        );
        Some(recorded.map(|outcome| ExecuteOutcome {
            replayed: true,
            ..outcome
        }))
    }

    fn exec_timeout(&self, requested_ms: Option<u64>) -> Result<Duration, EngineError> {
        let ms = requested_ms.unwrap_or(self.config.default_exec_timeout_ms);
        if ms == 0 || ms > self.config.max_exec_timeout_ms {
            return Err(EngineError::Validation(format!(
                "timeout must be between 1 and {}ms, got {}",
                self.config.max_exec_timeout_ms, ms
            )));
        }
        Ok(Duration::from_millis(ms))
    }

    pub fn history(&self, id: &SessionId) -> Result<Vec<CommandHistoryEntry>, EngineError> {
        self.history.list(id)
    }

    // ── Streaming ───────────────────────────────────────────────────────

    pub fn attach(&self, id: &SessionId) -> Result<Observer<C>, EngineError> {
        self.broker.attach(id)
    }

    pub fn detach(&self, observer_id: ObserverId) -> bool {
        self.broker.detach(observer_id)
    }

    /// Capture watched sessions and publish new terminal output.
    ///
    /// Returns the number of output events published.
    pub async fn poll_output(&self) -> usize {
        let mut published = 0;
        for cell in self.store.cells() {
            let watched = !cell.observers.lock().is_empty();
            let session = cell.session();
            if !watched || session.is_destroyed() {
                self.tail.lock().forget(cell.id());
                continue;
            }

            let capture = match self
                .sandbox
                .capture_output(session.sandbox_id.as_str(), self.config.tail_lines)
                .await
            {
                Ok(capture) => capture,
                Err(e) => {
                    tracing::debug!(session_id = %cell.id(), error = %e, "capture failed");
                    continue;
                }
            };

            let delta = self.tail.lock().update(cell.id(), capture);
            if let Some(text) = delta {
                let event = StreamEvent::output(text, self.clock.epoch_ms());
                if self.broker.publish_to(&cell, &event) > 0 {
                    published += 1;
                }
            }
        }
        published
    }
}

/// Validate a terminal dimension from the wire.
fn dimension(name: &str, value: i64) -> Result<u16, EngineError> {
    if value <= 0 || value > MAX_DIMENSION {
        return Err(EngineError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_DIMENSION, value
        )));
    }
    u16::try_from(value).map_err(|_| EngineError::Validation(format!("{} out of range", name)))
}

#[cfg(test)]
#[path = "manager_tests/mod.rs"]
mod tests;
