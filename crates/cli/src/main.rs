// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sx - sandboxed terminal sessions

mod client;
mod commands;
mod daemon_process;
mod env;
mod exit_error;
mod offline;
mod output;

use output::OutputFormat;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use commands::{daemon, exec, queue, session, stats};

use crate::client::DaemonClient;

#[derive(Parser)]
#[command(name = "sx", version, about = "Sandboxed terminal sessions")]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Session management
    Session(session::SessionArgs),
    /// Run code in a session (queued while the daemon is unreachable)
    Exec(exec::ExecArgs),
    /// Offline command queue
    Queue(queue::QueueArgs),
    /// Session counters
    Stats,
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

fn cli_command() -> clap::Command {
    Cli::command()
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// When the top-level message already contains every cause (thiserror
/// variants with `#[error("... {0}")]` and `#[from]`), only the top line is
/// shown. Otherwise the full chain is rendered.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let Some(command) = cli.command else {
        cli_command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Daemon(args) => daemon::daemon(args, format).await?,
        // Exec and queue decide for themselves what an unreachable daemon means
        Commands::Exec(args) => exec::handle(args, format).await?,
        Commands::Queue(args) => queue::handle(args.command, format).await?,
        Commands::Session(args) => {
            let client = if args.command.starts_daemon() {
                DaemonClient::connect_or_start()?
            } else {
                DaemonClient::connect()?
            };
            session::handle(args.command, &client, format).await?
        }
        Commands::Stats => {
            let client = DaemonClient::connect()?;
            stats::handle(&client, format).await?
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
