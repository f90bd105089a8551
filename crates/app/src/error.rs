//! Application error types

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not determine {0} directory")]
    NoProjectDirs(&'static str),

    #[error(transparent)]
    Core(#[from] ballot_core::Error),

    #[error(transparent)]
    Net(#[from] ballot_net::Error),

    #[error("{0}")]
    Usage(String),
}
