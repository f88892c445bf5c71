// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sx stats` - Session counters

use std::io::Write;

use anyhow::Result;
use sx_daemon::StatsView;

use crate::client::DaemonClient;
use crate::output::{format_elapsed, print_json, OutputFormat};

pub async fn handle(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let stats = client.stats().await?;
    match format {
        OutputFormat::Text => format_stats(&mut std::io::stdout(), &stats),
        OutputFormat::Json => print_json(&stats)?,
    }
    Ok(())
}

fn format_stats(w: &mut impl Write, stats: &StatsView) {
    let _ = writeln!(
        w,
        "Sessions:   {} active, {} idle, {} destroyed",
        stats.active_sessions, stats.idle_sessions, stats.destroyed_sessions
    );
    let _ = writeln!(w, "Created:    {}", stats.total_created);
    let _ = writeln!(w, "Destroyed:  {}", stats.total_destroyed);
    let _ = writeln!(w, "Uptime:     {}", format_elapsed(stats.uptime_secs));
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
