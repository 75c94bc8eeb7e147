//! Architectural layers
//!
//! `LayerSlot` is what a project configuration assigns a provider to.
//! `MacroLayer` is what the orchestrator deploys: every slot maps to exactly
//! one macro-layer, plus `Setup` and `L0` which exist per provider.

use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A provider-assignable slot in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSlot {
    /// Data acquisition (IoT ingestion)
    #[serde(rename = "layer_1")]
    L1,
    /// Processing
    #[serde(rename = "layer_2")]
    L2,
    /// Hot storage tier
    #[serde(rename = "layer_3_hot")]
    L3Hot,
    /// Cold storage tier
    #[serde(rename = "layer_3_cold")]
    L3Cold,
    /// Archive storage tier
    #[serde(rename = "layer_3_archive")]
    L3Archive,
    /// Twin management
    #[serde(rename = "layer_4")]
    L4,
    /// Visualization
    #[serde(rename = "layer_5")]
    L5,
}

impl LayerSlot {
    pub const ALL: [LayerSlot; 7] = [
        LayerSlot::L1,
        LayerSlot::L2,
        LayerSlot::L3Hot,
        LayerSlot::L3Cold,
        LayerSlot::L3Archive,
        LayerSlot::L4,
        LayerSlot::L5,
    ];

    /// Short key, e.g. `layer_3_hot`
    pub fn key(&self) -> &'static str {
        match self {
            LayerSlot::L1 => "layer_1",
            LayerSlot::L2 => "layer_2",
            LayerSlot::L3Hot => "layer_3_hot",
            LayerSlot::L3Cold => "layer_3_cold",
            LayerSlot::L3Archive => "layer_3_archive",
            LayerSlot::L4 => "layer_4",
            LayerSlot::L5 => "layer_5",
        }
    }

    /// Key used in `config_providers.json`, e.g. `layer_3_hot_provider`
    pub fn config_key(&self) -> String {
        format!("{}_provider", self.key())
    }

    /// Parse a `config_providers.json` key (with or without the `_provider` suffix)
    pub fn from_config_key(key: &str) -> Option<LayerSlot> {
        let key = key.strip_suffix("_provider").unwrap_or(key);
        LayerSlot::ALL.into_iter().find(|slot| slot.key() == key)
    }

    /// Providers offering the services this slot needs
    pub fn supported_providers(&self) -> &'static [Provider] {
        match self {
            // Managed twin graphs and hosted dashboards are not offered on gcp
            LayerSlot::L4 | LayerSlot::L5 => &[Provider::Aws, Provider::Azure],
            _ => &Provider::ALL,
        }
    }

    pub fn macro_layer(&self) -> MacroLayer {
        match self {
            LayerSlot::L1 => MacroLayer::L1,
            LayerSlot::L2 => MacroLayer::L2,
            LayerSlot::L3Hot => MacroLayer::L3Hot,
            LayerSlot::L3Cold => MacroLayer::L3Cold,
            LayerSlot::L3Archive => MacroLayer::L3Archive,
            LayerSlot::L4 => MacroLayer::L4,
            LayerSlot::L5 => MacroLayer::L5,
        }
    }
}

impl fmt::Display for LayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// An orchestration unit with its own deploy / destroy / info operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroLayer {
    Setup,
    L0,
    L1,
    L2,
    L3Hot,
    L3Cold,
    L3Archive,
    L4,
    L5,
}

impl MacroLayer {
    /// Deployment order. Destroy walks this backwards.
    pub const DEPLOY_ORDER: [MacroLayer; 9] = [
        MacroLayer::Setup,
        MacroLayer::L0,
        MacroLayer::L1,
        MacroLayer::L2,
        MacroLayer::L3Hot,
        MacroLayer::L3Cold,
        MacroLayer::L3Archive,
        MacroLayer::L4,
        MacroLayer::L5,
    ];

    pub fn destroy_order() -> impl Iterator<Item = MacroLayer> {
        Self::DEPLOY_ORDER.into_iter().rev()
    }

    /// The slot this layer is assigned through. `Setup` and `L0` exist on
    /// every provider in use and have no slot of their own.
    pub fn slot(&self) -> Option<LayerSlot> {
        match self {
            MacroLayer::Setup | MacroLayer::L0 => None,
            MacroLayer::L1 => Some(LayerSlot::L1),
            MacroLayer::L2 => Some(LayerSlot::L2),
            MacroLayer::L3Hot => Some(LayerSlot::L3Hot),
            MacroLayer::L3Cold => Some(LayerSlot::L3Cold),
            MacroLayer::L3Archive => Some(LayerSlot::L3Archive),
            MacroLayer::L4 => Some(LayerSlot::L4),
            MacroLayer::L5 => Some(LayerSlot::L5),
        }
    }

    /// Short code used in resource names and output keys
    pub fn code(&self) -> &'static str {
        match self {
            MacroLayer::Setup => "setup",
            MacroLayer::L0 => "l0",
            MacroLayer::L1 => "l1",
            MacroLayer::L2 => "l2",
            MacroLayer::L3Hot => "l3-hot",
            MacroLayer::L3Cold => "l3-cold",
            MacroLayer::L3Archive => "l3-archive",
            MacroLayer::L4 => "l4",
            MacroLayer::L5 => "l5",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MacroLayer::Setup => "setup",
            MacroLayer::L0 => "cross-cloud glue",
            MacroLayer::L1 => "acquisition",
            MacroLayer::L2 => "processing",
            MacroLayer::L3Hot => "hot storage",
            MacroLayer::L3Cold => "cold storage",
            MacroLayer::L3Archive => "archive storage",
            MacroLayer::L4 => "twin management",
            MacroLayer::L5 => "visualization",
        }
    }
}

impl fmt::Display for MacroLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroLayer::Setup => write!(f, "Setup"),
            other => write!(f, "{} ({})", other.code().to_uppercase(), other.description()),
        }
    }
}
