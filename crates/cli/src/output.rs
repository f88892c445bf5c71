// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;
use sx_core::{StreamEvent, StreamEventKind};

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Compact elapsed time: "5s", "2m", "1h", "3d"
pub fn format_elapsed(secs: u64) -> String {
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}

/// Format a timestamp as relative time
pub fn format_time_ago(epoch_ms: u64, now_ms: u64) -> String {
    if epoch_ms == 0 {
        return "-".to_string();
    }
    format_elapsed(now_ms.saturating_sub(epoch_ms) / 1000)
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Column separator: double space.
const SEP: &str = "  ";

/// Left-aligned table with widths computed from the data.
///
/// The last column is never padded. Nothing is written for an empty table.
pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn render(&self, out: &mut impl Write) {
        if self.rows.is_empty() {
            return;
        }
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .fold(header.chars().count(), usize::max)
            })
            .collect();

        let header: Vec<String> = self.headers.iter().map(|h| h.to_string()).collect();
        let _ = writeln!(out, "{}", self.line(&header, &widths));
        for row in &self.rows {
            let _ = writeln!(out, "{}", self.line(row, &widths));
        }
    }

    fn line(&self, cells: &[String], widths: &[usize]) -> String {
        let last = self.headers.len().saturating_sub(1);
        (0..self.headers.len())
            .map(|i| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                if i == last {
                    cell.to_string()
                } else {
                    format!("{:<width$}", cell, width = widths[i])
                }
            })
            .collect::<Vec<_>>()
            .join(SEP)
            .trim_end()
            .to_string()
    }
}

/// Text rendering of a stream event; heartbeats render as nothing.
pub fn format_event(event: &StreamEvent) -> Option<String> {
    let field = |name: &str| event.data.get(name).cloned().unwrap_or_default();
    match event.kind {
        StreamEventKind::Output => event.text().map(str::to_string),
        StreamEventKind::Status => {
            let status = event
                .session_status()
                .map_or("unknown", |status| status.as_str());
            match field("command_id").as_str() {
                Some(command_id) => Some(format!(
                    "[done] {} exit={} ({}ms)",
                    command_id,
                    field("exit_code"),
                    field("duration_ms"),
                )),
                None => Some(format!("[status] {}", status)),
            }
        }
        StreamEventKind::Error => Some(format!(
            "[error] {}",
            field("message").as_str().unwrap_or("unknown error")
        )),
        StreamEventKind::Heartbeat => None,
    }
}
