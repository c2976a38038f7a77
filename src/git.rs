//! Execution of the system `git` binary.
//!
//! Going through the `git` command automatically honours:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Personal access tokens embedded in URLs
//! - Any authentication configured in ~/.gitconfig

use std::path::Path;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

fn describe(git_dir: Option<&Path>, args: &[&str]) -> String {
    let mut command = String::from("git");
    if let Some(dir) = git_dir {
        command.push_str(&format!(" --git-dir {}", dir.display()));
    }
    for arg in args {
        command.push(' ');
        command.push_str(arg);
    }
    command
}

fn failure_message(stderr: &str) -> String {
    if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
    {
        format!(
            "{}\nAuthentication failed. Make sure you have access to the repository \
            (SSH key loaded in ssh-agent, credential helper or token in the URL).",
            stderr.trim_end()
        )
    } else {
        stderr.trim_end().to_string()
    }
}

fn run(git_dir: Option<&Path>, args: &[&str]) -> Result<String> {
    let command = describe(git_dir, args);
    debug!("Running {}", command);

    let mut process = Command::new("git");
    if let Some(dir) = git_dir {
        process.arg("--git-dir").arg(dir);
    }
    let output = process
        .args(args)
        .output()
        .map_err(|e| Error::GitCommand {
            command: command.clone(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).to_string()
        } else {
            stderr.to_string()
        };
        return Err(Error::GitCommand {
            command,
            stderr: failure_message(&stderr),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a git sub-command against the repository at `git_dir`.
pub fn exec(git_dir: &Path, args: &[&str]) -> Result<String> {
    run(Some(git_dir), args)
}

/// Create an empty bare repository at `path`.
pub fn init_bare(path: &Path) -> Result<()> {
    let path = path.display().to_string();
    run(None, &["init", "--bare", "--quiet", &path]).map(|_| ())
}
