//! Configuration error types

use crate::layer::LayerSlot;
use crate::provider::Provider;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating a project configuration.
///
/// Every variant is fatal: a configuration problem is never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing provider mapping for {}", .0.config_key())]
    MissingProvider(LayerSlot),

    #[error("Unknown provider '{0}' (expected aws, azure or gcp)")]
    UnknownProvider(String),

    #[error("Provider {provider} does not offer {}", slot.config_key())]
    UnsupportedProvider { slot: LayerSlot, provider: Provider },

    #[error("Invalid twin name '{name}': {reason}")]
    InvalidTwinName { name: String, reason: String },

    #[error("Invalid device id '{0}'")]
    InvalidDeviceId(String),

    #[error("Duplicate device id '{0}'")]
    DuplicateDevice(String),

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
