// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supported execution languages and their interpreters

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    Shell,
    Ruby,
}

impl Language {
    /// Interpreter program and the flag that makes it read code from the next argument.
    pub fn interpreter(self) -> (&'static str, &'static str) {
        match self {
            Language::Python => ("python3", "-c"),
            Language::JavaScript => ("node", "-e"),
            Language::Shell => ("sh", "-c"),
            Language::Ruby => ("ruby", "-e"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Shell => "shell",
            Language::Ruby => "ruby",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "shell" | "sh" | "bash" => Ok(Language::Shell),
            "ruby" | "rb" => Ok(Language::Ruby),
            other => Err(format!("unsupported language: {}", other)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "language_tests.rs"]
mod tests;
