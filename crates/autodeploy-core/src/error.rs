use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("cannot read manifest {}: {reason}", path.display())]
    ManifestRead { path: PathBuf, reason: String },

    #[error("cannot write manifest {}: {reason}", path.display())]
    ManifestWrite { path: PathBuf, reason: String },

    #[error("invalid environment '{0}': valid values are 'dev', 'tst' or 'prd'")]
    InvalidEnvironment(String),

    #[error("invalid branch '{0}': valid values are 'dev', 'develop' or a name containing 'release'")]
    InvalidBranch(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("checkout failed: {0}")]
    Checkout(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, DeployError>;
