//! Branch gate: validate the requested branch, then check it out.
//!
//! Validation failure is fatal. Checkout failure is only logged and the run
//! continues against whatever is currently checked out.

use crate::error::{DeployError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Accepts `dev`, `develop`, or any name containing `release`.
pub fn validate(branch: &str) -> Result<()> {
    if matches!(branch, "dev" | "develop") || branch.contains("release") {
        Ok(())
    } else {
        Err(DeployError::InvalidBranch(branch.to_string()))
    }
}

fn git_bin() -> Result<PathBuf> {
    which::which("git").map_err(|_| DeployError::Checkout("git is not installed".to_string()))
}

/// Run `git checkout <branch>` in `root`.
pub fn checkout(root: &Path, branch: &str) -> Result<()> {
    let git = git_bin()?;
    let output = Command::new(&git)
        .args(["checkout", branch])
        .current_dir(root)
        .output()
        .map_err(|e| DeployError::Checkout(e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeployError::Checkout(stderr.trim().to_string()));
    }
    Ok(())
}

/// Validate and check out `branch`. Only an invalid name is an error.
pub fn gate(root: &Path, branch: &str) -> Result<()> {
    if let Err(e) = validate(branch) {
        tracing::error!(
            "Invalid branch argument: {branch}. Valid values are 'dev', 'develop' or a release branch."
        );
        return Err(e);
    }

    match checkout(root, branch) {
        Ok(()) => tracing::info!("Switched to branch {branch}"),
        Err(e) => tracing::error!("Error switching to branch {branch}: {e}"),
    }
    Ok(())
}
