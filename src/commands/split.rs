//! Split command implementation
//!
//! A run goes through four steps:
//! 1. Load `.gitsplit.yml`
//! 2. Open the working repository, declare and fetch every remote
//! 3. Split the selected references and push the results
//! 4. Persist the idempotency records and wait for the pushes

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use std::path::PathBuf;

use gitsplit::config::{from_file, Config};
use gitsplit::defaults::{CONFIG_FILE, REMOTE_CONCURRENCY};
use gitsplit::orchestrator::SplitOrchestrator;
use gitsplit::splitter::LiteSplitter;
use gitsplit::uri::GitUri;
use gitsplit::workspace::{repository_path, WorkingSpace};

/// Arguments for a split run
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Path to config file
    #[arg(short, long, value_name = "PATH", env = "GITSPLIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only split this reference (repeatable); all matching references when absent
    #[arg(long = "ref", value_name = "NAME")]
    pub refs: Vec<String>,

    /// Working repository, local path or remote URL (overrides cache_dir)
    #[arg(long, value_name = "PATH", env = "GITSPLIT_CACHE")]
    pub cache_dir: Option<String>,

    /// Concurrent network operations per remote
    #[arg(long, value_name = "N", default_value_t = REMOTE_CONCURRENCY)]
    pub concurrency: usize,

    /// splitsh-lite binary to run
    #[arg(long, value_name = "PATH")]
    pub splitter_bin: Option<PathBuf>,
}

fn load_config(args: &SplitArgs) -> Result<Config> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

    if !config_path.exists() {
        anyhow::bail!("Configuration file not found: {}", config_path.display());
    }

    let mut config = from_file(&config_path)
        .with_context(|| format!("Unable to load {}", config_path.display()))?;
    if let Some(cache_dir) = &args.cache_dir {
        config.cache_uri = Some(GitUri::parse(cache_dir));
    }
    Ok(config)
}

/// Execute a split run
pub fn execute(args: SplitArgs) -> Result<()> {
    let config = load_config(&args)?;

    let repository = repository_path(&config);
    let mut workspace = WorkingSpace::open(config, &repository, args.concurrency)
        .with_context(|| format!("Unable to open {}", repository.display()))?;
    workspace
        .init()
        .context("Unable to initialize the working repository")?;

    let mut splitter = LiteSplitter::new(workspace.git_dir().to_path_buf());
    if let Some(binary) = args.splitter_bin {
        splitter = splitter.with_binary(binary);
    }

    SplitOrchestrator::new(&workspace, &splitter)?
        .split(&args.refs)
        .context("Split failed")?;
    workspace
        .finish()
        .context("Unable to persist the split cache")?;

    info!("Done");
    Ok(())
}
