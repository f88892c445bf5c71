// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sx queue` - Offline command queue

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use sx_core::OfflineQueueItem;
use sx_storage::QueueFile;

use crate::client::DaemonClient;
use crate::commands::exec::{print_drain_text, submit_item};
use crate::offline::{DrainControl, DrainReport, OfflineQueue, ReconnectTracker};
use crate::output::{format_time_ago, now_ms, print_json, OutputFormat, Table};

#[derive(Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommand,
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Show queued commands, oldest first
    List,
    /// Replay queued commands now
    Drain,
    /// Replay queued commands every time the daemon comes back
    Watch {
        /// Probe interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Remove one queued command without running it
    Drop {
        /// Item ID
        id: String,
    },
}

fn open_queue() -> Result<OfflineQueue<QueueFile>> {
    Ok(OfflineQueue::new(QueueFile::new(crate::env::queue_path()?)))
}

pub async fn handle(command: QueueCommand, format: OutputFormat) -> Result<()> {
    let queue = open_queue()?;
    match command {
        QueueCommand::List => {
            let items = queue.pending()?;
            match format {
                OutputFormat::Text if items.is_empty() => println!("Queue is empty"),
                OutputFormat::Text => format_queue(&mut std::io::stdout(), &items, now_ms()),
                OutputFormat::Json => print_json(&items)?,
            }
        }
        QueueCommand::Drain => {
            let control = cancel_on_ctrl_c();
            let queue = &queue;
            let report = queue
                .drain(&control, &mut move |item| submit_item(item, None, Some(queue)))
                .await?;
            report_drain(&report, format)?;
        }
        QueueCommand::Watch { interval_ms } => {
            let interval = interval_ms
                .map(Duration::from_millis)
                .or_else(crate::env::watch_interval_ms)
                .unwrap_or(Duration::from_secs(5));
            watch(&queue, interval, format).await?;
        }
        QueueCommand::Drop { id } => {
            if !queue.discard(&id)? {
                anyhow::bail!("no queued command with id {}", id);
            }
            if format == OutputFormat::Text {
                println!("Dropped {}", id);
            }
        }
    }
    Ok(())
}

/// Drain on every unreachable to reachable transition until ctrl-c.
async fn watch(
    queue: &OfflineQueue<QueueFile>,
    interval: Duration,
    format: OutputFormat,
) -> Result<()> {
    let control = cancel_on_ctrl_c();
    let mut tracker = ReconnectTracker::default();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    while !control.is_cancelled() {
        ticker.tick().await;
        let reachable = match DaemonClient::connect() {
            Ok(client) => client.ping().await.is_ok(),
            Err(_) => false,
        };
        if !tracker.observe(reachable) {
            continue;
        }
        if queue.is_empty()? {
            continue;
        }
        let report = queue
            .drain(&control, &mut move |item| submit_item(item, None, Some(queue)))
            .await?;
        report_drain(&report, format)?;
        if report.halted.is_some() {
            // Lost the daemon mid-drain; wait for the next reconnect
            tracker.observe(false);
        }
    }
    Ok(())
}

fn cancel_on_ctrl_c() -> DrainControl {
    let control = DrainControl::new();
    let handle = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    control
}

fn report_drain(report: &DrainReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Text => {
            print_drain_text(report);
            for submitted in &report.submitted {
                let replayed = if submitted.result.replayed {
                    " (already ran)"
                } else {
                    ""
                };
                println!(
                    "{} exit={}{}",
                    submitted.item.id, submitted.result.exit_code, replayed
                );
            }
            if let Some(halt) = &report.halted {
                eprintln!("Stopped at {}: {}", halt.item_id, halt.reason);
            }
            if report.remaining > 0 {
                println!("{} command(s) still queued", report.remaining);
            }
        }
    }
    Ok(())
}

fn format_queue(w: &mut impl Write, items: &[OfflineQueueItem], now_ms: u64) {
    let mut table = Table::new(vec!["ID", "QUEUED", "SESSION", "LANG", "CODE"]);
    for item in items {
        table.row(vec![
            item.id.clone(),
            format_time_ago(item.timestamp_ms, now_ms),
            item.session_id
                .as_ref()
                .map_or_else(|| "(new)".to_string(), ToString::to_string),
            item.language.clone(),
            item.code.lines().next().unwrap_or_default().to_string(),
        ]);
    }
    table.render(w);
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
