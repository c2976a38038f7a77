//! # Configuration Schema and Parsing
//!
//! This module defines the data structures that represent the `.gitsplit.yml`
//! configuration file, as well as the logic for parsing and validating it.
//!
//! ```yaml
//! cache_dir: /var/cache/gitsplit
//! project_dir: .
//! origins: ['^main$', '^v\d+\.\d+$']
//! splits:
//!   - prefix: 'src/Component/Lib/:'
//!     target: 'git@github.com:acme/lib.git'
//!   - prefix: ['docs/', 'LICENSE']
//!     target:
//!       - 'https://${GH_TOKEN}@github.com/acme/docs.git'
//!       - 'git@gitlab.com:acme/docs.git'
//! ```
//!
//! ## Key Components
//!
//! - **`Config`**: The whole file: where the working cache lives, where the
//!   project comes from, which references to consider and which splits to
//!   publish.
//! - **`SplitConfig`**: One extraction: an ordered list of `from[:to]` path
//!   prefixes and the targets receiving the result.
//!
//! `prefix` and `target` accept either a single string or a list of strings.
//! Both shapes are normalized into a `Vec<String>` while deserializing, so
//! the rest of the crate only ever sees ordered sequences.

use crate::defaults::{default_origins, CACHE_REMOTE, ORIGIN_REMOTE};
use crate::error::{Error, Result};
use crate::uri::GitUri;
use regex::Regex;
use serde::{Deserialize, Deserializer};

/// A value that may be written as one string or as a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StringCollection {
    One(String),
    Many(Vec<String>),
}

impl From<StringCollection> for Vec<String> {
    fn from(collection: StringCollection) -> Self {
        match collection {
            StringCollection::One(item) => vec![item],
            StringCollection::Many(items) => items,
        }
    }
}

fn string_collection<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    StringCollection::deserialize(deserializer).map(Into::into)
}

fn default_project_uri() -> GitUri {
    GitUri::parse(".")
}

/// One split: which subtrees to extract and where to publish them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SplitConfig {
    /// Ordered `from[:to]` rewrite rules.
    #[serde(rename = "prefix", deserialize_with = "string_collection")]
    pub prefixes: Vec<String>,
    /// Remote locations receiving the split, also used as remote aliases.
    #[serde(rename = "target", deserialize_with = "string_collection")]
    pub targets: Vec<String>,
}

impl SplitConfig {
    pub fn new<P, T>(prefixes: P, targets: T) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    /// The prefixes joined the way they are hashed into cache keys.
    pub fn joined_prefixes(&self) -> String {
        self.prefixes.join("-")
    }

    /// Human readable list of prefixes, for logs and errors.
    pub fn describe(&self) -> String {
        self.prefixes.join(", ")
    }
}

/// The parsed `.gitsplit.yml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Where the working repository (and its idempotency records) lives.
    #[serde(rename = "cache_dir", default)]
    pub cache_uri: Option<GitUri>,
    /// The repository whose history is split.
    #[serde(rename = "project_dir", default = "default_project_uri")]
    pub project_uri: GitUri,
    #[serde(default)]
    pub splits: Vec<SplitConfig>,
    /// Regular expressions over reference aliases (`main`, `v1.0`).
    #[serde(default = "default_origins")]
    pub origins: Vec<String>,
}

impl Config {
    /// Compile the `origins` patterns.
    pub fn origin_patterns(&self) -> Result<Vec<Regex>> {
        self.origins
            .iter()
            .map(|pattern| Regex::new(pattern).map_err(Error::Regex))
            .collect()
    }

    /// Every distinct target, in declaration order.
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = Vec::new();
        for target in self.splits.iter().flat_map(|split| &split.targets) {
            if !targets.contains(&target.as_str()) {
                targets.push(target.as_str());
            }
        }
        targets
    }

    fn validate(mut self) -> Result<Self> {
        if self.origins.is_empty() {
            self.origins = default_origins();
        }

        for pattern in &self.origins {
            if let Err(e) = Regex::new(pattern) {
                return Err(Error::ConfigParse {
                    message: format!("Invalid origin pattern {:?}: {}", pattern, e),
                    hint: Some("origins are regular expressions matched against branch and tag names".to_string()),
                });
            }
        }

        for (index, split) in self.splits.iter().enumerate() {
            if split.prefixes.is_empty() || split.prefixes.iter().any(|p| p.is_empty()) {
                return Err(Error::ConfigParse {
                    message: format!("Split #{} has an empty prefix", index),
                    hint: Some("Use 'prefix: path/to/dir/' or 'prefix: path/to/dir/:new/path/'".to_string()),
                });
            }
            if split.targets.is_empty() || split.targets.iter().any(|t| t.is_empty()) {
                return Err(Error::ConfigParse {
                    message: format!("Split #{} has no target", index),
                    hint: Some("Add 'target:' with the URL of the repository to publish to".to_string()),
                });
            }
            if let Some(reserved) = split
                .targets
                .iter()
                .find(|t| t.as_str() == ORIGIN_REMOTE || t.as_str() == CACHE_REMOTE)
            {
                return Err(Error::ConfigParse {
                    message: format!("Split #{} targets the reserved remote name {:?}", index, reserved),
                    hint: Some(format!("Write a local directory as './{}' or as an absolute path", reserved)),
                });
            }
        }

        Ok(self)
    }
}

/// Parses a YAML string into a validated `Config`.
pub fn parse(yaml_content: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(yaml_content).map_err(Error::Yaml)?;
    config.validate()
}

/// Parse a `Config` from a YAML file path
pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}
