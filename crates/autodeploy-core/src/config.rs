use crate::error::{DeployError, Result};
use crate::paths;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConnectionTarget
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionTarget {
    /// Database file. Relative paths resolve against the connections file.
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// ConnectionsConfig
// ---------------------------------------------------------------------------

/// Named connections, keyed by the identifiers environments map to
/// (`DEV_DB`, `TST_DB`, `PRD_DB`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionsConfig {
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionTarget>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl ConnectionsConfig {
    /// `AUTODEPLOY_CONNECTIONS` if set, else `~/.autodeploy/connections.yaml`.
    pub fn locate() -> Option<PathBuf> {
        match std::env::var_os(paths::CONNECTIONS_ENV) {
            Some(p) if !p.is_empty() => Some(PathBuf::from(p)),
            _ => paths::default_connections_path(),
        }
    }

    pub fn load_default() -> Result<Self> {
        let path = Self::locate().ok_or_else(|| {
            DeployError::Connection(format!(
                "no connections file: set {} or HOME",
                paths::CONNECTIONS_ENV
            ))
        })?;
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DeployError::Connection(format!(
                "connections file not found: {}",
                path.display()
            )));
        }
        let data = std::fs::read_to_string(path).map_err(|e| {
            DeployError::Connection(format!("cannot read connections file {}: {e}", path.display()))
        })?;
        let mut cfg: ConnectionsConfig = serde_yaml::from_str(&data).map_err(|e| {
            DeployError::Connection(format!("invalid connections file {}: {e}", path.display()))
        })?;
        cfg.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(cfg)
    }

    /// Database path for the connection `name`.
    pub fn database_path(&self, name: &str) -> Result<PathBuf> {
        let target = self
            .connections
            .get(name)
            .ok_or_else(|| DeployError::Connection(format!("unknown connection '{name}'")))?;
        if target.path.is_absolute() {
            Ok(target.path.clone())
        } else {
            Ok(self.base_dir.join(&target.path))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
