//! Repository locations as written in the configuration.
//!
//! A location is either an explicit URL (`https://...`, `file://...`), an
//! scp-like address (`git@host:org/repo.git`) or a plain filesystem path.
//! Plain paths are treated as `file` URIs.

use crate::path::{expand_env, resolve_path};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;

/// A parsed repository location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitUri {
    scheme: Option<String>,
    location: String,
}

impl GitUri {
    /// Parse a location string.
    pub fn parse(uri: &str) -> Self {
        if let Some((scheme, rest)) = uri.split_once("://") {
            return Self {
                scheme: Some(scheme.to_string()),
                location: rest.to_string(),
            };
        }

        // scp-like syntax: a colon before the first slash
        let head = uri.split('/').next().unwrap_or_default();
        if head.find(':').is_some_and(|index| index > 0) {
            return Self {
                scheme: None,
                location: uri.to_string(),
            };
        }

        Self {
            scheme: Some("file".to_string()),
            location: uri.to_string(),
        }
    }

    /// Whether the location designates the local filesystem.
    pub fn is_local(&self) -> bool {
        self.scheme.as_deref() == Some("file")
    }

    /// The location without its scheme.
    ///
    /// Local paths are resolved to absolute paths, remote locations only get
    /// environment variables expanded.
    pub fn schemeless(&self) -> String {
        if self.is_local() {
            resolve_path(&self.location).display().to_string()
        } else {
            expand_env(&self.location)
        }
    }

    /// The resolved path of a local location.
    pub fn local_path(&self) -> Option<PathBuf> {
        self.is_local().then(|| resolve_path(&self.location))
    }

    /// The location as handed to `git`.
    pub fn to_url(&self) -> String {
        match &self.scheme {
            Some(scheme) => format!("{}://{}", scheme, self.schemeless()),
            None => self.schemeless(),
        }
    }
}

impl fmt::Display for GitUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheme {
            Some(scheme) => write!(f, "{}://{}", scheme, self.location),
            None => f.write_str(&self.location),
        }
    }
}

impl<'de> Deserialize<'de> for GitUri {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(GitUri::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        let uri = GitUri::parse("https://github.com/acme/lib.git");
        assert!(!uri.is_local());
        assert_eq!(uri.to_url(), "https://github.com/acme/lib.git");
    }

    #[test]
    fn test_parse_scp_like() {
        let uri = GitUri::parse("git@github.com:acme/lib.git");
        assert!(!uri.is_local());
        assert_eq!(uri.to_url(), "git@github.com:acme/lib.git");
        assert_eq!(uri.local_path(), None);
    }

    #[test]
    fn test_parse_absolute_path() {
        let uri = GitUri::parse("/srv/git/project");
        assert!(uri.is_local());
        assert_eq!(uri.to_url(), "file:///srv/git/project");
        assert_eq!(uri.local_path(), Some(PathBuf::from("/srv/git/project")));
    }

    #[test]
    fn test_parse_file_url() {
        let uri = GitUri::parse("file:///srv/git/project");
        assert!(uri.is_local());
        assert_eq!(uri.schemeless(), "/srv/git/project");
    }

    #[test]
    fn test_relative_path_with_colon_after_slash_is_local() {
        let uri = GitUri::parse("./repos/a:b");
        assert!(uri.is_local());
    }

    #[test]
    fn test_display_keeps_raw_location() {
        let uri = GitUri::parse("~/project");
        assert_eq!(uri.to_string(), "file://~/project");
    }
}
