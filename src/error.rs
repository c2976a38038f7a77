//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for
//! `gitsplit`. It uses the `thiserror` library to create a single `Error`
//! enum covering every failure mode of a split run, each variant carrying the
//! operation context (remote alias, reference, prefixes) needed to diagnose
//! the failure from one terminal message.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. The variants fall into two groups:
//!   - run failures: remote identity, fetch, push, reference parsing, cache
//!     I/O, split and unknown-remote errors;
//!   - infrastructure failures: configuration, git process execution, worker
//!     pool, lock poisoning and wrapped library errors.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the library.
//!
//! Nothing in the core retries. Each layer wraps the error of the layer
//! below with its own context and hands it upward.

use thiserror::Error;

/// Main error type for gitsplit operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while parsing the `.gitsplit.yml` configuration file.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// Creating or updating the endpoint of a remote failed.
    #[error("Fail to configure remote {remote}: {message}")]
    RemoteIdentity { remote: String, message: String },

    /// Fetching the references of a remote failed.
    #[error("Fail to fetch remote {remote}: {message}")]
    Fetch { remote: String, message: String },

    /// Publishing a reference to a remote failed.
    #[error("Fail to push {reference} into {remote}: {message}")]
    Push {
        remote: String,
        reference: String,
        message: String,
    },

    /// A line of a reference enumeration could not be understood.
    #[error("Fail to parse reference {line:?}: {message}")]
    ReferenceParse { line: String, message: String },

    /// Reading or writing an idempotency record failed.
    #[error("Cache operation error for {key}: {message}")]
    CacheIo { key: String, message: String },

    /// The external split collaborator failed.
    #[error("Unable to split {reference} for {prefixes}: {message}")]
    Split {
        reference: String,
        prefixes: String,
        message: String,
    },

    /// A remote alias was requested that was never registered.
    #[error("The remote {alias} does not exist")]
    NotFound { alias: String },

    /// An error occurred while executing a Git command.
    #[error("Git command failed: {command} - {stderr}")]
    GitCommand { command: String, stderr: String },

    /// A worker pool could not be created.
    #[error("Worker pool error: {message}")]
    Pool { message: String },

    /// A pool task panicked instead of returning.
    #[error("Task #{index} panicked")]
    TaskPanicked { index: usize },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
