// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sx exec` - Run code in a session, queueing it while the daemon is away

use anyhow::Result;
use clap::Args;
use sx_core::{NoteId, OfflineQueueItem, SessionId};
use sx_daemon::ExecuteResult;
use sx_storage::{QueueFile, QueueStore};

use crate::client::{ClientError, DaemonClient};
use crate::exit_error::ExitError;
use crate::offline::{DrainControl, DrainReport, OfflineError, OfflineQueue, Submission};
use crate::output::{now_ms, print_json, OutputFormat};

#[derive(Args)]
pub struct ExecArgs {
    /// Code to run
    #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
    pub code: Vec<String>,

    /// Target session; a new session is opened when omitted
    #[arg(short, long)]
    pub session: Option<String>,

    #[arg(short, long, default_value = "shell")]
    pub language: String,

    /// Execution deadline in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Note and block the code came from
    #[arg(long)]
    pub note: Option<String>,
    #[arg(long, requires = "note")]
    pub block: Option<String>,

    /// Fail instead of queueing when the daemon is unreachable
    #[arg(long)]
    pub no_queue: bool,
}

impl ExecArgs {
    fn to_item(&self, timestamp_ms: u64) -> OfflineQueueItem {
        OfflineQueueItem::new(self.code.join(" "), self.language.clone(), timestamp_ms)
            .with_session(self.session.clone().map(SessionId::new))
            .with_note(self.note.clone().map(NoteId::new), self.block.clone())
    }
}

/// Run one item against the daemon, opening a session if it names none.
///
/// The item id is sent as the request id. A session opened here is bound
/// into `queue` so a retry, or a later item of the same note, reuses it.
/// It is destroyed again when the execute fails and nothing queued will
/// run in it.
pub async fn submit_item<S: QueueStore>(
    item: OfflineQueueItem,
    timeout_ms: Option<u64>,
    queue: Option<&OfflineQueue<S>>,
) -> Result<ExecuteResult, ClientError> {
    let client = DaemonClient::connect()?;
    let (session_id, opened) = match &item.session_id {
        Some(id) => (id.to_string(), None),
        None => {
            let session = client
                .create(None, item.note_id.as_ref().map(ToString::to_string), None, None)
                .await?;
            let binding = queue
                .and_then(|q| {
                    q.bind_session(&item, &SessionId::new(session.session_id.as_str()))
                        .ok()
                })
                .unwrap_or_default();
            (session.session_id, Some(binding))
        }
    };

    let result = client
        .execute(
            &session_id,
            &item.code,
            &item.language,
            timeout_ms,
            Some(item.id.clone()),
        )
        .await;

    if let (Err(e), Some(binding)) = (&result, opened) {
        let reused = binding.others > 0 || (binding.item && e.is_retryable());
        if !reused {
            // Best effort; an unreachable daemon reaps it once idle
            let _ = client.destroy(&session_id).await;
        }
    }
    result
}

pub async fn handle(args: ExecArgs, format: OutputFormat) -> Result<()> {
    let item = args.to_item(now_ms());
    let timeout_ms = args.timeout_ms;

    if args.no_queue {
        let result = submit_item::<QueueFile>(item, timeout_ms, None).await?;
        return report_result(&result, &DrainReport::default(), format);
    }

    let queue = &OfflineQueue::new(QueueFile::new(crate::env::queue_path()?));
    let submission = queue
        .submit_or_enqueue(item, &DrainControl::new(), move |item| {
            submit_item(item, timeout_ms, Some(queue))
        })
        .await;

    match submission {
        Ok(Submission::Executed { result, drain }) => report_result(&result, &drain, format),
        Ok(queued @ Submission::Queued { .. }) => {
            match format {
                OutputFormat::Json => print_json(&queued)?,
                OutputFormat::Text => {
                    if let Submission::Queued {
                        item,
                        reason,
                        drain,
                    } = &queued
                    {
                        print_drain_text(drain);
                        eprintln!("Queued {} for later ({})", item.id, reason);
                    }
                }
            }
            Ok(())
        }
        Err(OfflineError::Rejected(e)) => Err(e.into()),
        Err(OfflineError::Store(e)) => Err(e.into()),
    }
}

fn report_result(result: &ExecuteResult, drain: &DrainReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "outcome": "executed",
            "result": result,
            "drain": drain,
        }))?,
        OutputFormat::Text => {
            print_drain_text(drain);
            print!("{}", result.output);
            if !result.output.is_empty() && !result.output.ends_with('\n') {
                println!();
            }
        }
    }
    if result.exit_code != 0 {
        return Err(ExitError::new(result.exit_code, String::new()).into());
    }
    Ok(())
}

/// Summary of a drain that ran ahead of a new command, on stderr
pub fn print_drain_text(drain: &DrainReport) {
    if !drain.submitted.is_empty() {
        eprintln!("Replayed {} queued command(s)", drain.submitted.len());
    }
    for rejected in &drain.rejected {
        eprintln!(
            "Dropped queued command {}: {}",
            rejected.item.id, rejected.message
        );
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
