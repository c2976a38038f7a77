//! CLI argument parsing and logging setup

use anyhow::Result;
use clap::Parser;

use crate::commands;

/// gitsplit - Publish subtrees of a repository as standalone repositories
#[derive(Parser, Debug)]
#[command(name = "gitsplit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    split: commands::split::SplitArgs,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn init_logging(&self) {
        // RUST_LOG wins over --log-level
        let env = env_logger::Env::default().default_filter_or(self.log_level.as_str());
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .format_target(false)
            .try_init();
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logging();
        commands::split::execute(self.split)
    }
}
