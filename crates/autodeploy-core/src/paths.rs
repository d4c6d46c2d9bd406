use crate::manifest::DeploymentUnit;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// File and directory constants
// ---------------------------------------------------------------------------

pub const MANIFEST_FILE: &str = "configuration.yaml";
pub const LOG_DIR: &str = "deployment_logs";
pub const SCRIPT_EXTENSION: &str = "sql";

pub const CONNECTIONS_ENV: &str = "AUTODEPLOY_CONNECTIONS";
pub const CONNECTIONS_DIR: &str = ".autodeploy";
pub const CONNECTIONS_FILE: &str = "connections.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}

pub fn log_dir(root: &Path) -> PathBuf {
    root.join(LOG_DIR)
}

/// `{root}/{schema}/{object_type}/{name}.sql`
pub fn script_path(root: &Path, unit: &DeploymentUnit) -> PathBuf {
    root.join(&unit.schema)
        .join(&unit.object_type)
        .join(format!("{}.{SCRIPT_EXTENSION}", unit.name))
}

/// Default connections file under the user's home directory.
pub fn default_connections_path() -> Option<PathBuf> {
    let home = home::home_dir()?;
    Some(home.join(CONNECTIONS_DIR).join(CONNECTIONS_FILE))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
