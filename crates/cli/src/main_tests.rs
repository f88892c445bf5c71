// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::error::ErrorKind;
use clap::FromArgMatches;

use super::{cli_command, format_error, Cli, Commands};
use crate::commands::session::SessionCommand;
use crate::output::OutputFormat;

fn parse(argv: &[&str]) -> Result<Cli, clap::Error> {
    let matches = cli_command().try_get_matches_from(argv)?;
    Cli::from_arg_matches(&matches)
}

#[test]
fn version_long() {
    let err = cli_command()
        .try_get_matches_from(["sx", "--version"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayVersion);
}

#[test]
fn output_flag_is_global() {
    let cli = parse(&["sx", "session", "list", "-o", "json"]).unwrap();
    assert_eq!(cli.output, OutputFormat::Json);
    assert!(matches!(
        cli.command,
        Some(Commands::Session(ref args)) if matches!(args.command, SessionCommand::List)
    ));
}

#[test]
fn resize_accepts_negative_numbers() {
    // Rejected by the daemon, not by argument parsing
    let cli = parse(&["sx", "session", "resize", "s-1", "-5", "24"]).unwrap();
    let Some(Commands::Session(args)) = cli.command else {
        panic!("expected session command");
    };
    assert!(matches!(
        args.command,
        SessionCommand::Resize { cols: -5, rows: 24, .. }
    ));
}

#[test]
fn exec_takes_trailing_code() {
    let cli = parse(&["sx", "exec", "-s", "s-1", "grep", "-r", "todo", "."]).unwrap();
    let Some(Commands::Exec(args)) = cli.command else {
        panic!("expected exec command");
    };
    assert_eq!(args.code, vec!["grep", "-r", "todo", "."]);
    assert_eq!(args.session.as_deref(), Some("s-1"));
}

#[test]
fn no_subcommand_parses() {
    let cli = parse(&["sx"]).unwrap();
    assert!(cli.command.is_none());
}

#[derive(Debug, thiserror::Error)]
#[error("outer: {0}")]
struct Outer(#[source] Inner);

#[derive(Debug, thiserror::Error)]
#[error("inner detail")]
struct Inner;

#[derive(Debug, thiserror::Error)]
#[error("wrapped")]
struct Opaque(#[source] Inner);

#[test]
fn redundant_chain_is_collapsed() {
    let err = anyhow::Error::new(Outer(Inner));
    assert_eq!(format_error(&err), "outer: inner detail");
}

#[test]
fn informative_chain_is_kept() {
    let err = anyhow::Error::new(Opaque(Inner));
    assert_eq!(
        format_error(&err),
        "wrapped\n\nCaused by:\n    0: inner detail"
    );
}
