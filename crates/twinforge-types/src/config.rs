//! Project configuration
//!
//! A project directory carries three JSON documents:
//!
//! - `config.json`: twin name, storage retention and feature flags
//! - `config_providers.json`: one `layer_*_provider` entry per slot
//! - `config_iot_devices.json`: the device list
//!
//! An optional `config_inter_cloud.json` holds previously persisted
//! connection records. The loader here is a reference implementation of the
//! external validator: anything inconsistent is a [`ConfigError`].

use crate::connection::InterCloudRecords;
use crate::error::{ConfigError, Result};
use crate::layer::LayerSlot;
use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.json";
pub const PROVIDERS_FILE: &str = "config_providers.json";
pub const DEVICES_FILE: &str = "config_iot_devices.json";
pub const INTER_CLOUD_FILE: &str = "config_inter_cloud.json";

const MAX_TWIN_NAME_LEN: usize = 24;

/// Validated digital twin name: lowercase alphanumerics and `-`, starting
/// with a letter, at most 24 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TwinName(String);

impl TwinName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: &str| ConfigError::InvalidTwinName {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if name.len() > MAX_TWIN_NAME_LEN {
            return Err(invalid("must be at most 24 characters"));
        }
        if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(invalid("must start with a lowercase letter"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(invalid("only lowercase letters, digits and '-' are allowed"));
        }
        if name.ends_with('-') || name.contains("--") {
            return Err(invalid("hyphens must separate words"));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TwinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TwinName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        TwinName::new(value)
    }
}

impl From<TwinName> for String {
    fn from(name: TwinName) -> Self {
        name.0
    }
}

/// IoT device identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(id))
        } else {
            Err(ConfigError::InvalidDeviceId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        DeviceId::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// A device entry from `config_iot_devices.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: DeviceId,
    /// Telemetry properties the device reports
    #[serde(default)]
    pub properties: Vec<String>,
}

impl DeviceConfig {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            properties: Vec::new(),
        }
    }
}

/// Optional pipeline features gating individual units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFlag {
    UseEventChecking,
    ReturnFeedbackToDevice,
    TriggerNotificationWorkflow,
}

impl FeatureFlag {
    pub fn key(&self) -> &'static str {
        match self {
            FeatureFlag::UseEventChecking => "use_event_checking",
            FeatureFlag::ReturnFeedbackToDevice => "return_feedback_to_device",
            FeatureFlag::TriggerNotificationWorkflow => "trigger_notification_workflow",
        }
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Feature flag values; every flag defaults to off
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub use_event_checking: bool,
    pub return_feedback_to_device: bool,
    pub trigger_notification_workflow: bool,
}

impl FeatureFlags {
    pub fn is_enabled(&self, flag: FeatureFlag) -> bool {
        match flag {
            FeatureFlag::UseEventChecking => self.use_event_checking,
            FeatureFlag::ReturnFeedbackToDevice => self.return_feedback_to_device,
            FeatureFlag::TriggerNotificationWorkflow => self.trigger_notification_workflow,
        }
    }

    pub fn set(&mut self, flag: FeatureFlag, enabled: bool) {
        match flag {
            FeatureFlag::UseEventChecking => self.use_event_checking = enabled,
            FeatureFlag::ReturnFeedbackToDevice => self.return_feedback_to_device = enabled,
            FeatureFlag::TriggerNotificationWorkflow => {
                self.trigger_notification_workflow = enabled
            }
        }
    }
}

/// How long data stays in each storage tier before it is moved on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRetention {
    pub hot_days: u32,
    pub cold_days: u32,
}

impl Default for StorageRetention {
    fn default() -> Self {
        Self {
            hot_days: 30,
            cold_days: 90,
        }
    }
}

/// Resolved project configuration for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub twin_name: TwinName,
    pub providers: BTreeMap<LayerSlot, Provider>,
    pub devices: Vec<DeviceConfig>,
    pub features: FeatureFlags,
    pub retention: StorageRetention,
    /// Connection records persisted by earlier invocations
    pub inter_cloud: InterCloudRecords,
}

#[derive(Debug, Deserialize)]
struct RawProjectFile {
    digital_twin_name: String,
    #[serde(default)]
    hot_storage_size_in_days: Option<u32>,
    #[serde(default)]
    cold_storage_size_in_days: Option<u32>,
    #[serde(default)]
    features: FeatureFlags,
}

#[derive(Debug, Default, Deserialize)]
struct RawInterCloudFile {
    #[serde(default)]
    connections: InterCloudRecords,
}

impl ProjectConfig {
    /// Create a config with every slot assigned to `provider`
    pub fn single_provider(twin_name: TwinName, provider: Provider) -> Self {
        Self {
            twin_name,
            providers: LayerSlot::ALL.into_iter().map(|s| (s, provider)).collect(),
            devices: Vec::new(),
            features: FeatureFlags::default(),
            retention: StorageRetention::default(),
            inter_cloud: InterCloudRecords::new(),
        }
    }

    pub fn with_provider(mut self, slot: LayerSlot, provider: Provider) -> Self {
        self.providers.insert(slot, provider);
        self
    }

    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.devices.push(device);
        self
    }

    pub fn with_feature(mut self, flag: FeatureFlag, enabled: bool) -> Self {
        self.features.set(flag, enabled);
        self
    }

    /// Provider assigned to a slot
    pub fn provider(&self, slot: LayerSlot) -> Result<Provider> {
        self.providers
            .get(&slot)
            .copied()
            .ok_or(ConfigError::MissingProvider(slot))
    }

    /// Every provider hosting at least one slot
    pub fn providers_in_use(&self) -> BTreeSet<Provider> {
        self.providers.values().copied().collect()
    }

    pub fn is_enabled(&self, flag: FeatureFlag) -> bool {
        self.features.is_enabled(flag)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.devices.iter().map(|d| &d.id)
    }

    /// Check provider coverage and device uniqueness
    pub fn validate(&self) -> Result<()> {
        for slot in LayerSlot::ALL {
            let provider = self.provider(slot)?;
            if !slot.supported_providers().contains(&provider) {
                return Err(ConfigError::UnsupportedProvider { slot, provider });
            }
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if !seen.insert(device.id.as_str()) {
                return Err(ConfigError::DuplicateDevice(device.id.to_string()));
            }
        }

        Ok(())
    }

    /// Load and validate a project directory
    pub fn load(project_path: &Path) -> Result<Self> {
        let project: RawProjectFile = read_json(&project_path.join(CONFIG_FILE))?;
        let raw_providers: BTreeMap<String, String> =
            read_json(&project_path.join(PROVIDERS_FILE))?;
        let devices: Vec<DeviceConfig> = read_json(&project_path.join(DEVICES_FILE))?;

        let inter_cloud_path = project_path.join(INTER_CLOUD_FILE);
        let inter_cloud = if inter_cloud_path.exists() {
            read_json::<RawInterCloudFile>(&inter_cloud_path)?.connections
        } else {
            InterCloudRecords::new()
        };

        let mut providers = BTreeMap::new();
        for (key, value) in raw_providers {
            let slot = LayerSlot::from_config_key(&key).ok_or(ConfigError::UnknownKey(key))?;
            providers.insert(slot, value.parse()?);
        }

        let defaults = StorageRetention::default();
        let config = Self {
            twin_name: TwinName::new(project.digital_twin_name)?,
            providers,
            devices,
            features: project.features,
            retention: StorageRetention {
                hot_days: project.hot_storage_size_in_days.unwrap_or(defaults.hot_days),
                cold_days: project
                    .cold_storage_size_in_days
                    .unwrap_or(defaults.cold_days),
            },
            inter_cloud,
        };

        config.validate()?;
        Ok(config)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
