// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    python       = { "python",     Language::Python },
    python3      = { "python3",    Language::Python },
    py_upper     = { "PY",         Language::Python },
    javascript   = { "javascript", Language::JavaScript },
    node         = { "node",       Language::JavaScript },
    bash         = { "bash",       Language::Shell },
    sh_padded    = { " sh ",       Language::Shell },
    ruby         = { "rb",         Language::Ruby },
)]
fn parses_aliases(input: &str, expected: Language) {
    assert_eq!(input.parse::<Language>().unwrap(), expected);
}

#[test]
fn rejects_unknown_language() {
    let err = "cobol".parse::<Language>().unwrap_err();
    assert!(err.contains("cobol"), "got: {}", err);
}

#[test]
fn shell_runs_through_sh() {
    assert_eq!(Language::Shell.interpreter(), ("sh", "-c"));
    assert_eq!(Language::Python.to_string(), "python");
}
