//! Path manipulation utilities for gitsplit

use regex::{Captures, Regex};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
            .expect("environment variable pattern is valid")
    })
}

/// Replace `$VAR` and `${VAR}` with the value of the environment variable.
///
/// Unset variables expand to the empty string.
pub fn expand_env(input: &str) -> String {
    env_pattern()
        .replace_all(input, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            env::var(name).unwrap_or_default()
        })
        .into_owned()
}

/// Resolve a user supplied path into an absolute one.
///
/// Environment variables are expanded, a leading `~` is replaced by the home
/// directory and relative paths are joined to the current directory.
pub fn resolve_path(path: &str) -> PathBuf {
    let expanded = expand_env(path);

    let expanded = match expanded.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => format!("{}{}", home.display(), rest),
            None => expanded,
        },
        _ => expanded,
    };

    let path = Path::new(&expanded);
    if path.is_absolute() {
        return path.to_path_buf();
    }

    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
