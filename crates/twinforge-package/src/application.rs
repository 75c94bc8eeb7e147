//! Packaging applications

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use twinforge_types::{MacroLayer, Provider};

/// One macro-layer's units on one provider, packaged together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ApplicationId {
    L0Glue,
    L1,
    L2,
    L3Hot,
    L3Cold,
    L4,
}

impl ApplicationId {
    pub const ALL: [ApplicationId; 6] = [
        ApplicationId::L0Glue,
        ApplicationId::L1,
        ApplicationId::L2,
        ApplicationId::L3Hot,
        ApplicationId::L3Cold,
        ApplicationId::L4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationId::L0Glue => "l0-glue",
            ApplicationId::L1 => "l1",
            ApplicationId::L2 => "l2",
            ApplicationId::L3Hot => "l3-hot",
            ApplicationId::L3Cold => "l3-cold",
            ApplicationId::L4 => "l4",
        }
    }

    pub fn layer(&self) -> MacroLayer {
        match self {
            ApplicationId::L0Glue => MacroLayer::L0,
            ApplicationId::L1 => MacroLayer::L1,
            ApplicationId::L2 => MacroLayer::L2,
            ApplicationId::L3Hot => MacroLayer::L3Hot,
            ApplicationId::L3Cold => MacroLayer::L3Cold,
            ApplicationId::L4 => MacroLayer::L4,
        }
    }

    /// `None` for layers that host no code
    pub fn for_layer(layer: MacroLayer) -> Option<ApplicationId> {
        Self::ALL.into_iter().find(|a| a.layer() == layer)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown application '{s}'"))
    }
}

impl TryFrom<String> for ApplicationId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApplicationId> for String {
    fn from(value: ApplicationId) -> Self {
        value.as_str().to_string()
    }
}

/// How a provider wants units shipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackagingPolicy {
    /// One artifact per unit
    PerUnit,
    /// One artifact per application, routed by a generated dispatch table
    Multiplexed,
}

impl PackagingPolicy {
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Azure => PackagingPolicy::Multiplexed,
            Provider::Aws | Provider::Gcp => PackagingPolicy::PerUnit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_layer_has_an_application() {
        for layer in MacroLayer::DEPLOY_ORDER {
            let hosts_code = !matches!(
                layer,
                MacroLayer::Setup | MacroLayer::L3Archive | MacroLayer::L5
            );
            assert_eq!(ApplicationId::for_layer(layer).is_some(), hosts_code, "{layer}");
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("l3-hot".parse::<ApplicationId>().unwrap(), ApplicationId::L3Hot);
        assert!("l5".parse::<ApplicationId>().is_err());
    }
}
