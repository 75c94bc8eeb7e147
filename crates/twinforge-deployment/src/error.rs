//! Deployment error types

use crate::adapter::CloudError;
use crate::connections::ConnectionStoreError;
use std::path::PathBuf;
use thiserror::Error;
use twinforge_package::PackagingError;
use twinforge_resilience::RetryError;
use twinforge_types::{ConfigError, MacroLayer, Provider};

/// Errors raised by layer orchestration.
///
/// Only control-plane calls are ever retried, inside the executor; every
/// variant here is terminal for the operation that raised it.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invalid settings in {}: {message}", .path.display())]
    Settings { path: PathBuf, message: String },

    #[error("No adapter registered for provider {0}")]
    MissingAdapter(Provider),

    #[error("Pre-flight check failed for {layer} on {provider}; missing: {}", .missing.join(", "))]
    Preflight {
        layer: MacroLayer,
        provider: Provider,
        missing: Vec<String>,
    },

    #[error("Deploying {layer} on {provider} failed during {operation}: {source}")]
    Deployment {
        layer: MacroLayer,
        provider: Provider,
        operation: String,
        #[source]
        source: RetryError<CloudError>,
    },

    #[error("Destroying {layer} on {provider} left {} failure(s): {}", .failures.len(), .failures.join("; "))]
    Destroy {
        layer: MacroLayer,
        provider: Provider,
        failures: Vec<String>,
    },

    #[error("Teardown incomplete: {} layer(s) failed", .0.len())]
    Incomplete(Vec<DeployError>),

    #[error("Packaging error: {0}")]
    Packaging(#[from] PackagingError),

    #[error("Connection store error: {0}")]
    ConnectionStore(#[from] ConnectionStoreError),
}

impl DeployError {
    /// Components reported missing by a failed pre-flight check
    pub fn missing(&self) -> &[String] {
        match self {
            DeployError::Preflight { missing, .. } => missing,
            _ => &[],
        }
    }
}

/// Result type for deployment operations
pub type Result<T> = std::result::Result<T, DeployError>;
