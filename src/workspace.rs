//! # Working Space
//!
//! The working space is the bare repository every remote shares: the project
//! history is fetched into it, splits are computed in it, idempotency records
//! are stored in it and targets are pushed from it.
//!
//! `init` declares the remotes of the run (`cache`, `origin` and one per
//! distinct target), fetches all of them concurrently, garbage-collects the
//! endpoints of targets that left the configuration and waits for all of it.
//!
//! When `cache_dir` points to a remote location, the working repository is
//! kept under the local cache root and the idempotency records are fetched
//! from, and pushed back to, that location.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::config::Config;
use crate::defaults::{default_cache_root, REMOTE_CONCURRENCY};
use crate::error::Result;
use crate::git;
use crate::hash::hash;
use crate::remote::{Remote, RemoteRegistry, HEADS, SPLIT_FLAG, TAGS};
use crate::repository::{DefaultGitOperations, GitOperations};
use crate::uri::GitUri;

pub use crate::defaults::{CACHE_REMOTE, ORIGIN_REMOTE};

/// Where the working repository lives for `config`.
pub fn repository_path(config: &Config) -> PathBuf {
    match &config.cache_uri {
        Some(uri) => match uri.local_path() {
            Some(path) => path,
            None => default_cache_root().join(hash(&uri.to_string())),
        },
        None => default_cache_root().join(hash(&config.project_uri.to_string())),
    }
}

/// Open the repository at `path`, creating a bare one when nothing exists.
///
/// Returns the git directory to operate on.
fn prepare_repository(path: &Path) -> Result<PathBuf> {
    let dot_git = path.join(".git");
    if dot_git.exists() {
        return Ok(dot_git);
    }
    if path.exists() {
        return Ok(path.to_path_buf());
    }

    info!("Initializing cache repository at {}", path.display());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    git::init_bare(path)?;
    Ok(path.to_path_buf())
}

/// The repository and the remotes of one run.
pub struct WorkingSpace {
    config: Config,
    git: Arc<dyn GitOperations>,
    remotes: RemoteRegistry,
}

impl WorkingSpace {
    /// Open (or create) the working repository at `path`.
    pub fn open(config: Config, path: &Path, concurrency: usize) -> Result<Self> {
        let git_dir = prepare_repository(path)?;
        Self::with_operations(config, Arc::new(DefaultGitOperations::new(git_dir)), concurrency)
    }

    /// Open the working repository at its configured location.
    pub fn from_config(config: Config) -> Result<Self> {
        let path = repository_path(&config);
        Self::open(config, &path, REMOTE_CONCURRENCY)
    }

    /// Build a working space over custom `GitOperations`.
    pub fn with_operations(
        config: Config,
        git: Arc<dyn GitOperations>,
        concurrency: usize,
    ) -> Result<Self> {
        let remotes = RemoteRegistry::with_concurrency(Arc::clone(&git), concurrency)?;
        Ok(Self {
            config,
            git,
            remotes,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn git(&self) -> &Arc<dyn GitOperations> {
        &self.git
    }

    pub fn git_dir(&self) -> &Path {
        self.git.git_dir()
    }

    pub fn remotes(&self) -> &RemoteRegistry {
        &self.remotes
    }

    pub fn remotes_mut(&mut self) -> &mut RemoteRegistry {
        &mut self.remotes
    }

    fn cache_url(&self) -> String {
        match &self.config.cache_uri {
            Some(uri) if !uri.is_local() => uri.to_url(),
            _ => String::new(),
        }
    }

    /// Declare and fetch every remote of the run, then drop stale endpoints.
    ///
    /// Tasks queued before a failed declaration are still waited for.
    pub fn init(&mut self) -> Result<()> {
        let declared = self.declare_remotes();
        let flushed = self.remotes.flush();
        declared?;
        flushed
    }

    fn declare_remotes(&mut self) -> Result<()> {
        let cache_url = self.cache_url();
        self.remotes.add(CACHE_REMOTE, &cache_url, &[SPLIT_FLAG])?.fetch();

        info!("Updating cache from {}", self.config.project_uri);
        let origin_url = self.config.project_uri.to_url();
        self.remotes.add(ORIGIN_REMOTE, &origin_url, &[HEADS, TAGS])?.fetch();

        let targets: Vec<String> = self.config.targets().into_iter().map(str::to_string).collect();
        for target in targets {
            let url = GitUri::parse(&target).to_url();
            self.remotes.add(&target, &url, &[HEADS, TAGS])?.fetch();
        }

        self.remotes.clean();
        Ok(())
    }

    fn cache_remote(&self) -> Result<&Remote> {
        self.remotes.get(CACHE_REMOTE)
    }

    /// Persist the idempotency records when they live remotely, and wait for
    /// every pending task.
    pub fn finish(&self) -> Result<()> {
        let cache = self.cache_remote()?;
        if !cache.url().is_empty() {
            let local = cache.local_name(&format!("refs/{}", SPLIT_FLAG));
            cache.push_ref(&format!("+{}/*:refs/{}/*", local, SPLIT_FLAG));
        }
        self.remotes.flush()
    }
}
