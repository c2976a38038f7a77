//! # Working Repository Operations
//!
//! Every read and write the engine performs against the shared object store
//! goes through the `GitOperations` trait. The production implementation,
//! `DefaultGitOperations`, shells out to `git` on one bare repository; tests
//! swap in an in-memory implementation to observe exactly which references
//! were written and which network pushes were issued.
//!
//! ## Reference listing format
//!
//! `list_references` returns raw `<object id>\t<reference name>` lines for
//! every reference strictly below the given prefix. Parsing (and rejecting
//! malformed output) is left to the caller, see
//! [`crate::reference::parse_listing`].

use crate::error::Result;
use crate::git;
use crate::reference::ObjectId;
use std::path::{Path, PathBuf};

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Location of the repository the operations apply to.
    fn git_dir(&self) -> &Path;

    /// Ids of the configured remote endpoints.
    fn list_remotes(&self) -> Result<Vec<String>>;

    fn create_remote(&self, id: &str, url: &str) -> Result<()>;

    fn set_remote_url(&self, id: &str, url: &str) -> Result<()>;

    fn delete_remote(&self, id: &str) -> Result<()>;

    /// Fetch the given refspecs from a remote, pruning destination references
    /// that no longer exist upstream.
    fn fetch(&self, remote_id: &str, refspecs: &[String]) -> Result<()>;

    /// Force-push the given refspecs to a remote.
    fn push(&self, remote_id: &str, refspecs: &[String]) -> Result<()>;

    /// Make the remote an exact copy of every local reference.
    fn push_mirror(&self, remote_id: &str) -> Result<()>;

    /// Raw listing of the references below `prefix`.
    fn list_references(&self, prefix: &str) -> Result<String>;

    /// Create or overwrite a local reference.
    fn update_reference(&self, name: &str, id: &ObjectId) -> Result<()>;

    fn delete_reference(&self, name: &str) -> Result<()>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command on a local (usually bare) repository.
pub struct DefaultGitOperations {
    git_dir: PathBuf,
}

impl DefaultGitOperations {
    pub fn new(git_dir: PathBuf) -> Self {
        Self { git_dir }
    }
}

impl GitOperations for DefaultGitOperations {
    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn list_remotes(&self) -> Result<Vec<String>> {
        let output = git::exec(&self.git_dir, &["remote"])?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn create_remote(&self, id: &str, url: &str) -> Result<()> {
        git::exec(&self.git_dir, &["remote", "add", id, url]).map(|_| ())
    }

    fn set_remote_url(&self, id: &str, url: &str) -> Result<()> {
        git::exec(&self.git_dir, &["remote", "set-url", id, url]).map(|_| ())
    }

    fn delete_remote(&self, id: &str) -> Result<()> {
        git::exec(&self.git_dir, &["remote", "remove", id]).map(|_| ())
    }

    fn fetch(&self, remote_id: &str, refspecs: &[String]) -> Result<()> {
        let mut args = vec!["fetch", "--prune", "--no-tags", "--quiet", remote_id];
        args.extend(refspecs.iter().map(String::as_str));
        git::exec(&self.git_dir, &args).map(|_| ())
    }

    fn push(&self, remote_id: &str, refspecs: &[String]) -> Result<()> {
        let mut args = vec!["push", "--force", "--quiet", remote_id];
        args.extend(refspecs.iter().map(String::as_str));
        git::exec(&self.git_dir, &args).map(|_| ())
    }

    fn push_mirror(&self, remote_id: &str) -> Result<()> {
        git::exec(&self.git_dir, &["push", "--mirror", "--quiet", remote_id]).map(|_| ())
    }

    fn list_references(&self, prefix: &str) -> Result<String> {
        git::exec(
            &self.git_dir,
            &["for-each-ref", "--format=%(objectname)%09%(refname)", prefix],
        )
    }

    fn update_reference(&self, name: &str, id: &ObjectId) -> Result<()> {
        git::exec(&self.git_dir, &["update-ref", name, id.as_str()]).map(|_| ())
    }

    fn delete_reference(&self, name: &str) -> Result<()> {
        git::exec(&self.git_dir, &["update-ref", "-d", name]).map(|_| ())
    }
}
