// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sx daemon` - Daemon management commands

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::process::Command;

use crate::client::DaemonClient;
use crate::daemon_process::{daemon_dir, daemon_stop, find_sxd_binary};
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (foreground or background)
    Start {
        /// Run in foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon; every session is destroyed
    Stop,
    /// Check daemon status
    Status,
    /// View daemon logs
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        DaemonCommand::Start { foreground } => start(foreground).await,
        DaemonCommand::Stop => stop().await,
        DaemonCommand::Status => status(format).await,
        DaemonCommand::Logs { limit } => logs(limit, format),
    }
}

async fn start(foreground: bool) -> Result<()> {
    if foreground {
        let status = Command::new(find_sxd_binary()).status()?;
        if !status.success() {
            return Err(anyhow!("Daemon exited with status: {}", status));
        }
        return Ok(());
    }

    if let Ok(client) = DaemonClient::connect() {
        if let Ok(stats) = client.stats().await {
            println!("Daemon already running (uptime: {})", format_uptime(stats.uptime_secs));
            return Ok(());
        }
    }

    DaemonClient::connect_or_start().map_err(|e| anyhow!("{}", e))?;
    println!("Daemon started");
    Ok(())
}

async fn stop() -> Result<()> {
    match daemon_stop().await {
        Ok(true) => println!("Daemon stopped"),
        Ok(false) => println!("Daemon not running"),
        Err(e) => return Err(anyhow!("Failed to stop daemon: {}", e)),
    }
    Ok(())
}

async fn status(format: OutputFormat) -> Result<()> {
    let not_running = || match format {
        OutputFormat::Text => {
            println!("Daemon not running");
            Ok(())
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "status": "not_running" })),
    };

    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => return not_running(),
    };

    // A socket file without a daemon behind it reads as not running
    let stats = match client.stats().await {
        Ok(stats) => stats,
        Err(e) if e.is_retryable() => return not_running(),
        Err(e) => return Err(e.into()),
    };
    let version = client
        .hello()
        .await
        .unwrap_or_else(|_| "unknown".to_string());

    match format {
        OutputFormat::Text => {
            println!("Status: running");
            println!("Version: {}", version);
            println!("Uptime: {}", format_uptime(stats.uptime_secs));
            println!(
                "Sessions: {} active, {} idle",
                stats.active_sessions, stats.idle_sessions
            );
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": "running",
            "version": version,
            "uptime_secs": stats.uptime_secs,
            "uptime": format_uptime(stats.uptime_secs),
            "stats": stats,
        }))?,
    }

    Ok(())
}

fn logs(limit: usize, format: OutputFormat) -> Result<()> {
    let log_path = daemon_dir()?.join("daemon.log");

    let lines = if log_path.exists() {
        read_last_lines(&log_path, limit)?
    } else {
        Vec::new()
    };

    match format {
        OutputFormat::Text if !log_path.exists() => {
            println!("No log file found at {}", log_path.display())
        }
        OutputFormat::Text => {
            for line in &lines {
                println!("{}", line);
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "log_path": log_path.to_string_lossy(),
            "lines": lines,
        }))?,
    }
    Ok(())
}

fn read_last_lines(path: &std::path::Path, n: usize) -> Result<Vec<String>> {
    use std::io::{BufRead, BufReader};
    let file = std::fs::File::open(path)?;
    let mut lines: Vec<String> = BufReader::new(file)
        .lines()
        .collect::<std::io::Result<_>>()?;
    let start = lines.len().saturating_sub(n);
    Ok(lines.split_off(start))
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
