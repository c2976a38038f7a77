//! Default values for gitsplit configuration.
//!
//! This module provides centralized default values used across the library
//! and the command line, ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE: &str = ".gitsplit.yml";

/// Number of fetch/push tasks a single remote runs at the same time.
pub const REMOTE_CONCURRENCY: usize = 10;

/// Alias of the remote holding idempotency records.
pub const CACHE_REMOTE: &str = "cache";

/// Alias of the remote holding the project being split.
pub const ORIGIN_REMOTE: &str = "origin";

/// Reference patterns used when the configuration declares no `origins`.
pub fn default_origins() -> Vec<String> {
    vec![".*".to_string()]
}

/// Returns the default cache root directory.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/gitsplit` (XDG Base Directory)
/// - macOS: `~/Library/Caches/gitsplit`
/// - Windows: `{FOLDERID_LocalAppData}\gitsplit`
///
/// Falls back to `.gitsplit-cache` in the current directory if the
/// platform cache directory cannot be determined.
///
/// This can be overridden by `cache_dir` in the configuration, the
/// `--cache-dir` CLI flag or the `GITSPLIT_CACHE` environment variable.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".gitsplit-cache"))
        .join("gitsplit")
}
