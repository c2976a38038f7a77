//! # gitsplit
//!
//! This library publishes subtrees of a repository as standalone
//! repositories. For every reference of a project and every configured
//! split, it extracts the history of the split's path prefixes and pushes the
//! result to the split's targets, remembering what it already did so repeated
//! runs only redo the work the project's changes call for.
//!
//! ## Quick Example
//!
//! ```
//! use gitsplit::config;
//!
//! let config = config::parse(r#"
//! splits:
//!   - prefix: 'src/Lib/:'
//!     target: 'git@github.com:acme/lib.git'
//! "#).unwrap();
//! assert_eq!(config.splits.len(), 1);
//! assert_eq!(config.targets(), vec!["git@github.com:acme/lib.git"]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Working space (`workspace`)**: A bare repository shared by every
//!   remote of a run. Histories are fetched into it, split in it and pushed
//!   from it.
//! - **Remotes (`remote`)**: The project (`origin`), the idempotency records
//!   (`cache`) and the targets. Each remote mirrors its references under a
//!   private local namespace and runs its network tasks on its own
//!   `WorkerPool` (`pool`).
//! - **Idempotency cache (`cache`)**: Per (reference, split) pair, the last
//!   split source and result, stored as references.
//! - **Splitter (`splitter`)**: The external collaborator extracting prefixed
//!   history; `splitsh-lite` by default.
//! - **Git access (`repository`, `git`)**: Every git interaction goes through
//!   the `GitOperations` trait so the engine can run against a fake.
//!
//! ## Execution Flow
//!
//! 1.  **Init**: Declare the remotes, fetch all of them concurrently and drop
//!     endpoints of targets that left the configuration.
//! 2.  **Split**: Walk the selected references of `origin`; split the pairs
//!     whose cache entry is missing or stale; queue pushes to the targets.
//! 3.  **Finish**: Persist remote cache records and wait for every push.

pub mod cache;
pub mod config;
pub mod defaults;
pub mod error;
pub mod git;
pub mod hash;
pub mod orchestrator;
pub mod path;
pub mod pool;
pub mod reference;
pub mod remote;
pub mod repository;
pub mod splitter;
pub mod uri;
pub mod workspace;

mod identity_proptest;

#[cfg(test)]
mod testing;
