use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UntestedError {
    #[error("another test has been registered with the name {0}. You must choose a unique name.")]
    DuplicateTest(String),

    #[error("invalid test name '{0}': expected module.category.test")]
    InvalidName(String),

    #[error("failed to write report to {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = UntestedError> = std::result::Result<T, E>;
