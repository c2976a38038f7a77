//! # gitsplit CLI
//!
//! This is the binary entry point for the `gitsplit` command-line tool.
//!
//! Its responsibilities are parsing command-line arguments with `clap`,
//! setting up logging and running the split. The engine itself lives in the
//! library crate; the binary is a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
