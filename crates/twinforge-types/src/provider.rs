//! Cloud providers
//!
//! Provider names arrive from hand-edited configuration files, so parsing is
//! case-insensitive and folds the common aliases onto one canonical value.
//! Two slots compare as "same provider" only after canonicalisation.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A supported cloud provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
}

impl Provider {
    /// Every provider, in a stable order
    pub const ALL: [Provider; 3] = [Provider::Aws, Provider::Azure, Provider::Gcp];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::Gcp => "gcp",
        }
    }

    /// Resolve a provider name or alias, ignoring case and surrounding whitespace.
    pub fn canonicalize(name: &str) -> Option<Provider> {
        match name.trim().to_ascii_lowercase().as_str() {
            "aws" | "amazon" | "amazon_web_services" => Some(Provider::Aws),
            "azure" | "microsoft" | "microsoft_azure" => Some(Provider::Azure),
            "gcp" | "google" | "google_cloud" | "googlecloud" => Some(Provider::Gcp),
            _ => None,
        }
    }

    /// Human readable name used in operator-facing messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Aws => "AWS",
            Provider::Azure => "Azure",
            Provider::Gcp => "Google Cloud",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::canonicalize(s).ok_or_else(|| ConfigError::UnknownProvider(s.to_string()))
    }
}

impl TryFrom<String> for Provider {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Provider> for String {
    fn from(provider: Provider) -> Self {
        provider.as_str().to_string()
    }
}
