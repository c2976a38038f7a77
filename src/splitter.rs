//! # History Splitting Collaborator
//!
//! Extracting the history of a set of subtrees is delegated to an external
//! tool. The engine only relies on the [`ReferenceSplitter`] contract:
//!
//! - the input reference already exists in the working repository;
//! - prefixes are ordered `from[:to]` rewrite rules;
//! - on success the id of a synthetic commit containing only the prefixed
//!   subtrees (moved under `to` when given) is returned;
//! - on failure an error is returned and nothing is retried.
//!
//! [`LiteSplitter`] implements it with the `splitsh-lite` binary.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};
use crate::reference::ObjectId;

/// One path rewrite rule: keep `from`, optionally moved to `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    pub from: String,
    pub to: Option<String>,
}

impl Prefix {
    /// Parse `from[:to]`. An empty `to` means the subtree becomes the root.
    pub fn parse(rule: &str) -> Self {
        match rule.split_once(':') {
            Some((from, to)) => Self {
                from: from.to_string(),
                to: Some(to.to_string()),
            },
            None => Self {
                from: rule.to_string(),
                to: None,
            },
        }
    }

    pub fn parse_all(rules: &[String]) -> Vec<Self> {
        rules.iter().map(|rule| Self::parse(rule)).collect()
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.to {
            Some(to) => write!(f, "{}:{}", self.from, to),
            None => f.write_str(&self.from),
        }
    }
}

/// Extracts the prefixed history of a reference.
pub trait ReferenceSplitter: Send + Sync {
    fn split(&self, reference: &str, prefixes: &[Prefix]) -> Result<ObjectId>;
}

/// `ReferenceSplitter` backed by the `splitsh-lite` command.
pub struct LiteSplitter {
    git_dir: PathBuf,
    binary: PathBuf,
}

impl LiteSplitter {
    pub const DEFAULT_BINARY: &'static str = "splitsh-lite";

    pub fn new(git_dir: PathBuf) -> Self {
        Self {
            git_dir,
            binary: PathBuf::from(Self::DEFAULT_BINARY),
        }
    }

    pub fn with_binary(mut self, binary: PathBuf) -> Self {
        self.binary = binary;
        self
    }

    fn arguments(&self, reference: &str, prefixes: &[Prefix]) -> Vec<String> {
        let mut args = vec![
            format!("--path={}", self.git_dir.display()),
            format!("--origin={}", reference),
        ];
        for prefix in prefixes {
            // splitsh-lite wants an explicit, possibly empty, destination
            let rule = match &prefix.to {
                Some(to) => format!("{}:{}", prefix.from, to),
                None => format!("{}:", prefix.from),
            };
            args.push(format!("--prefix={}", rule));
        }
        args
    }
}

/// The last non-empty line of the tool output is the resulting commit.
fn parse_output(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).rev().find(|line| !line.is_empty())
}

impl ReferenceSplitter for LiteSplitter {
    fn split(&self, reference: &str, prefixes: &[Prefix]) -> Result<ObjectId> {
        let describe = || {
            prefixes
                .iter()
                .map(Prefix::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let split_error = |message: String| Error::Split {
            reference: reference.to_string(),
            prefixes: describe(),
            message,
        };

        let args = self.arguments(reference, prefixes);
        debug!("Running {} {}", self.binary.display(), args.join(" "));
        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .map_err(|e| split_error(format!("Unable to run {}: {}", self.binary.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(split_error(stderr.trim_end().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let head = parse_output(&stdout)
            .ok_or_else(|| split_error("the split produced no commit".to_string()))?;
        ObjectId::parse(head).map_err(|e| split_error(e.to_string()))
    }
}
