use crate::error::DeployError;
use std::fmt;

// ---------------------------------------------------------------------------
// DeployStatus
// ---------------------------------------------------------------------------

/// Status of one manifest leaf.
///
/// Only `Pending` is acted on. Any value outside the known vocabulary is
/// carried verbatim as `Other` so it survives a save untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeployStatus {
    Pending,
    Deployed,
    Failed,
    Other(String),
}

impl DeployStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DeployStatus::Pending => "deploy",
            DeployStatus::Deployed => "deployed",
            DeployStatus::Failed => "failed",
            DeployStatus::Other(s) => s,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, DeployStatus::Pending)
    }

    /// Parse a status string from the manifest. Never fails.
    pub fn parse(s: &str) -> Self {
        match s {
            "deploy" => DeployStatus::Pending,
            "deployed" => DeployStatus::Deployed,
            "failed" => DeployStatus::Failed,
            other => DeployStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Dev,
    Tst,
    Prd,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Tst => "tst",
            Environment::Prd => "prd",
        }
    }

    /// Connection name backing this environment.
    pub fn target(self) -> &'static str {
        match self {
            Environment::Dev => "DEV_DB",
            Environment::Tst => "TST_DB",
            Environment::Prd => "PRD_DB",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "tst" => Ok(Environment::Tst),
            "prd" => Ok(Environment::Prd),
            _ => Err(DeployError::InvalidEnvironment(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
