//! Packaging error types

use std::path::PathBuf;
use thiserror::Error;
use twinforge_types::ConfigError;

#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("No source for unit '{unit}' (looked in {})", .path.display())]
    MissingSource { unit: String, path: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Artifact '{0}' has no manifest.json")]
    MissingManifest(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Packaging task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, PackagingError>;
