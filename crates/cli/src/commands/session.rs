// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sx session` - Session management commands

use std::io::Write;

use anyhow::Result;
use clap::{Args, Subcommand};
use sx_core::CommandHistoryEntry;
use sx_daemon::SessionView;

use crate::client::DaemonClient;
use crate::output::{format_event, format_time_ago, now_ms, print_json, OutputFormat, Table};

#[derive(Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Create a session with a fresh sandbox
    Create {
        /// Owner recorded on the session
        #[arg(long)]
        owner: Option<String>,
        /// Note the session belongs to
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        cols: Option<u16>,
        #[arg(long)]
        rows: Option<u16>,
    },
    /// List live sessions
    List,
    /// Show a session without counting as activity
    Status { id: String },
    /// Keep a session alive
    Touch { id: String },
    /// Send raw input to the session terminal
    Input {
        id: String,
        data: String,
        /// Append a newline
        #[arg(short = 'n', long)]
        newline: bool,
    },
    /// Resize the session terminal
    Resize {
        id: String,
        #[arg(allow_negative_numbers = true)]
        cols: i64,
        #[arg(allow_negative_numbers = true)]
        rows: i64,
    },
    /// Command history of a session
    History { id: String },
    /// Follow the session's events until it is destroyed
    Attach { id: String },
    /// Destroy a session and release its sandbox
    Destroy { id: String },
}

impl SessionCommand {
    /// Commands that may start the daemon when it is not running
    pub fn starts_daemon(&self) -> bool {
        matches!(self, SessionCommand::Create { .. })
    }
}

pub async fn handle(
    command: SessionCommand,
    client: &DaemonClient,
    format: OutputFormat,
) -> Result<()> {
    match command {
        SessionCommand::Create {
            owner,
            note,
            cols,
            rows,
        } => {
            let session = client.create(owner, note, cols, rows).await?;
            match format {
                OutputFormat::Text => println!(
                    "Created session {} (sandbox {}, expires in {}s)",
                    session.session_id, session.sandbox_id, session.expires_in_secs
                ),
                OutputFormat::Json => print_json(&session)?,
            }
        }
        SessionCommand::List => {
            let sessions = client.list_sessions().await?;
            match format {
                OutputFormat::Text if sessions.is_empty() => println!("No sessions"),
                OutputFormat::Text => {
                    format_session_list(&mut std::io::stdout(), &sessions, now_ms())
                }
                OutputFormat::Json => print_json(&sessions)?,
            }
        }
        SessionCommand::Status { id } => {
            let session = client.status(&id).await?;
            show_session(&session, format)?;
        }
        SessionCommand::Touch { id } => {
            let session = client.touch(&id).await?;
            show_session(&session, format)?;
        }
        SessionCommand::Input { id, data, newline } => {
            let data = if newline { format!("{}\n", data) } else { data };
            client.input(&id, &data).await?;
            if format == OutputFormat::Text {
                println!("Sent {} bytes to session {}", data.len(), id);
            }
        }
        SessionCommand::Resize { id, cols, rows } => {
            client.resize(&id, cols, rows).await?;
            if format == OutputFormat::Text {
                println!("Resized session {} to {}x{}", id, cols, rows);
            }
        }
        SessionCommand::History { id } => {
            let entries = client.history(&id).await?;
            match format {
                OutputFormat::Text if entries.is_empty() => println!("No commands"),
                OutputFormat::Text => {
                    format_history(&mut std::io::stdout(), &entries, now_ms())
                }
                OutputFormat::Json => print_json(&entries)?,
            }
        }
        SessionCommand::Attach { id } => {
            let mut failed = None;
            client
                .stream(&id, |event| {
                    let written = match format {
                        OutputFormat::Text => match format_event(event) {
                            Some(line) => writeln!(std::io::stdout(), "{}", line),
                            None => Ok(()),
                        },
                        OutputFormat::Json => serde_json::to_string(event)
                            .map_err(std::io::Error::other)
                            .and_then(|json| writeln!(std::io::stdout(), "{}", json)),
                    };
                    // A closed stdout ends the attachment
                    match written {
                        Ok(()) => true,
                        Err(e) => {
                            failed = Some(e);
                            false
                        }
                    }
                })
                .await?;
            if let Some(e) = failed {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }
        SessionCommand::Destroy { id } => {
            let message = client.destroy(&id).await?;
            match format {
                OutputFormat::Text => println!("{}: {}", id, message),
                OutputFormat::Json => print_json(&serde_json::json!({
                    "session_id": id,
                    "message": message,
                }))?,
            }
        }
    }

    Ok(())
}

fn show_session(session: &SessionView, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => format_session(&mut std::io::stdout(), session, now_ms()),
        OutputFormat::Json => print_json(session)?,
    }
    Ok(())
}

fn format_session(w: &mut impl Write, session: &SessionView, now_ms: u64) {
    let _ = writeln!(w, "Session:  {}", session.session_id);
    let _ = writeln!(w, "Sandbox:  {}", session.sandbox_id);
    let _ = writeln!(w, "Status:   {}", session.status.as_str());
    if let Some(owner) = &session.owner {
        let _ = writeln!(w, "Owner:    {}", owner);
    }
    if let Some(note) = &session.note_id {
        let _ = writeln!(w, "Note:     {}", note);
    }
    let _ = writeln!(w, "Size:     {}x{}", session.cols, session.rows);
    let _ = writeln!(
        w,
        "Active:   {} ago",
        format_time_ago(session.last_activity_at_ms, now_ms)
    );
    if !session.status.is_terminal() {
        let _ = writeln!(w, "Expires:  in {}s", session.expires_in_secs);
    }
}

fn format_session_list(w: &mut impl Write, sessions: &[SessionView], now_ms: u64) {
    let mut table = Table::new(vec!["SESSION", "STATUS", "OWNER", "ACTIVE", "EXPIRES"]);
    for s in sessions {
        table.row(vec![
            s.session_id.clone(),
            s.status.as_str().to_string(),
            s.owner.clone().unwrap_or_else(|| "-".to_string()),
            format_time_ago(s.last_activity_at_ms, now_ms),
            format!("{}s", s.expires_in_secs),
        ]);
    }
    table.render(w);
}

fn format_history(w: &mut impl Write, entries: &[CommandHistoryEntry], now_ms: u64) {
    let mut table = Table::new(vec!["COMMAND", "WHEN", "EXIT", "TIME", "CODE"]);
    for entry in entries {
        let exit = entry
            .exit_code
            .map_or_else(|| "pending".to_string(), |code| code.to_string());
        let duration = entry
            .duration_ms
            .map_or_else(|| "-".to_string(), |ms| format!("{}ms", ms));
        let code = entry.command.lines().next().unwrap_or_default().to_string();
        table.row(vec![
            entry.command_id.to_string(),
            format_time_ago(entry.timestamp_ms, now_ms),
            exit,
            duration,
            code,
        ]);
    }
    table.render(w);
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
