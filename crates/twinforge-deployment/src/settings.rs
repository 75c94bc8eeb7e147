//! Deployer settings
//!
//! Optional `twinforge.toml` in the project directory. Every key is
//! optional; absent keys keep their defaults.
//!
//! ```toml
//! max_attempts = 6
//! initial_backoff_ms = 2000
//! max_backoff_ms = 30000
//! backoff_multiplier = 2.0
//! propagation_wait_ms = 10000
//! warmup_ms = 15000
//! ```

use crate::error::{DeployError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use twinforge_resilience::{BackoffSchedule, RetryPolicy};

pub const SETTINGS_FILE: &str = "twinforge.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployerSettings {
    /// Attempts per control-plane call, the first one included
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    /// Pause after a role is created and assigned
    pub propagation_wait_ms: u64,
    /// Pause after code upload
    pub warmup_ms: u64,
}

impl Default for DeployerSettings {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_backoff_ms: 2_000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
            propagation_wait_ms: 10_000,
            warmup_ms: 15_000,
        }
    }
}

impl DeployerSettings {
    /// No waits and near-instant retries, for the in-memory control plane
    pub fn immediate() -> Self {
        Self {
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            propagation_wait_ms: 0,
            warmup_ms: 0,
            ..Self::default()
        }
    }

    /// Read `twinforge.toml` from a project, falling back to defaults
    pub fn load(project_path: &Path) -> Result<Self> {
        let path = project_path.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| DeployError::Settings {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let settings: Self = toml::from_str(&contents).map_err(|e| DeployError::Settings {
            path: path.clone(),
            message: e.to_string(),
        })?;

        if settings.backoff_multiplier < 1.0 {
            return Err(DeployError::Settings {
                path,
                message: "backoff_multiplier must be at least 1.0".into(),
            });
        }
        Ok(settings)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            BackoffSchedule::Exponential {
                initial: Duration::from_millis(self.initial_backoff_ms),
                max: Duration::from_millis(self.max_backoff_ms),
                multiplier: self.backoff_multiplier,
            },
        )
    }

    pub fn propagation_wait(&self) -> Duration {
        Duration::from_millis(self.propagation_wait_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        assert_eq!(DeployerSettings::load(dir.path()).unwrap(), DeployerSettings::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "max_attempts = 3\nwarmup_ms = 500\n").unwrap();

        let settings = DeployerSettings::load(dir.path()).unwrap();
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.warmup(), Duration::from_millis(500));
        assert_eq!(settings.propagation_wait_ms, 10_000);
        assert_eq!(settings.retry_policy().max_attempts, 3);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "retries = 3\n").unwrap();
        assert!(matches!(
            DeployerSettings::load(dir.path()),
            Err(DeployError::Settings { .. })
        ));
    }
}
