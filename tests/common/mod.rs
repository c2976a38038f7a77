//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::MINIMAL);
//!     fixture.command_with_config().assert().failure();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::{git, GitFixture, TestFixture};
}

/// Common configuration YAML snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// Smallest valid configuration.
    pub const MINIMAL: &str = r#"
splits:
  - prefix: lib/
    target: /nonexistent/lib.git
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "splits: [unclosed";

    /// Valid YAML rejected by validation.
    pub const EMPTY_PREFIX: &str = r#"
splits:
  - prefix: ''
    target: /nonexistent/lib.git
"#;

    /// Origin pattern that is not a regular expression.
    pub const BAD_ORIGIN: &str = r#"
origins: ['(unclosed']
splits:
  - prefix: lib/
    target: /nonexistent/lib.git
"#;
}

/// A temporary directory holding a `.gitsplit.yml`.
#[allow(dead_code)]
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `.gitsplit.yml` configuration file with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child(".gitsplit.yml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join(".gitsplit.yml")
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("gitsplit");
        cmd.current_dir(self.path())
            .env_remove("GITSPLIT_CONFIG")
            .env_remove("GITSPLIT_CACHE");
        cmd
    }

    /// Create a command with the config file path argument.
    pub fn command_with_config(&self) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg("--config").arg(self.config_path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `git` in `dir` and return its trimmed standard output.
#[allow(dead_code)]
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "user.name=gitsplit", "-c", "user.email=gitsplit@example.com"])
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A project repository on `main`, plus helpers to create bare targets.
#[allow(dead_code)]
pub struct GitFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl GitFixture {
    pub fn new() -> Self {
        let fixture = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        };
        let project = fixture.project();
        std::fs::create_dir_all(&project).expect("Failed to create project directory");
        git(&project, &["init", "--quiet"]);
        git(&project, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        fixture
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn project(&self) -> PathBuf {
        self.path().join("project")
    }

    pub fn cache(&self) -> PathBuf {
        self.path().join("cache")
    }

    /// Commit `content` at `file` and return the new commit id.
    pub fn commit(&self, file: &str, content: &str) -> String {
        let project = self.project();
        let path = project.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        git(&project, &["add", "--all"]);
        git(&project, &["commit", "--quiet", "-m", file]);
        git(&project, &["rev-parse", "HEAD"])
    }

    /// Create an empty bare repository and return its path.
    pub fn bare_target(&self, name: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::create_dir_all(&path).expect("Failed to create target directory");
        git(&path, &["init", "--bare", "--quiet"]);
        path
    }

    /// A configuration publishing `prefix` to `target`.
    pub fn config(&self, prefix: &str, target: &Path) -> String {
        format!(
            "cache_dir: {}\nproject_dir: {}\nsplits:\n  - prefix: '{}'\n    target: '{}'\n",
            self.cache().display(),
            self.project().display(),
            prefix,
            target.display()
        )
    }
}
