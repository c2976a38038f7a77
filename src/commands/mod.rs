//! # CLI Command Implementations
//!
//! Each command lives in its own file with:
//! - an `Args` struct that defines the command-specific arguments and
//!   options, derived using `clap`;
//! - an `execute` function that takes the parsed `Args` and drives the
//!   `gitsplit` library.

pub mod split;
