//! Script locator: `{root}/{schema}/{object_type}/{name}.sql`.

use crate::error::Result;
use crate::manifest::DeploymentUnit;
use crate::paths;
use std::path::{Path, PathBuf};

pub fn resolve(root: &Path, unit: &DeploymentUnit) -> PathBuf {
    paths::script_path(root, unit)
}

/// Read a script, returning its trimmed text.
///
/// `Ok(None)` when the file does not exist or holds only whitespace; both mean
/// there is nothing to execute. Other I/O failures are returned as errors.
pub fn read(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        tracing::error!("File not found: {}", path.display());
        return Ok(None);
    }

    let text = std::fs::read_to_string(path)?;
    let script = text.trim();
    if script.is_empty() {
        tracing::warn!("Skipping {}, no SQL to execute.", path.display());
        return Ok(None);
    }

    tracing::info!("Query fetched from {}", path.display());
    Ok(Some(script.to_string()))
}
