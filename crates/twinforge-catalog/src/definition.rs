//! Function definitions

use serde::Serialize;
use std::fmt;
use twinforge_types::{Boundary, DeviceId, FeatureFlag, MacroLayer, Provider};

/// A deployable unit as registered in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FunctionDefinition {
    /// Unique within its layer
    pub name: &'static str,
    pub layer: MacroLayer,
    pub providers: &'static [Provider],
    /// Set for cross-cloud glue
    pub boundary: Option<Boundary>,
    /// Unit is only deployed when this flag is on
    pub feature: Option<FeatureFlag>,
    /// Source directory when it differs from `name`
    pub directory: Option<&'static str>,
    /// Expanded once per configured IoT device
    pub per_device: bool,
}

impl FunctionDefinition {
    pub const fn new(name: &'static str, layer: MacroLayer, providers: &'static [Provider]) -> Self {
        Self {
            name,
            layer,
            providers,
            boundary: None,
            feature: None,
            directory: None,
            per_device: false,
        }
    }

    pub const fn glue(name: &'static str, boundary: Boundary, providers: &'static [Provider]) -> Self {
        Self {
            boundary: Some(boundary),
            ..Self::new(name, MacroLayer::L0, providers)
        }
    }

    pub const fn gated(mut self, flag: FeatureFlag) -> Self {
        self.feature = Some(flag);
        self
    }

    pub const fn in_directory(mut self, directory: &'static str) -> Self {
        self.directory = Some(directory);
        self
    }

    pub const fn per_device(mut self) -> Self {
        self.per_device = true;
        self
    }

    pub fn is_glue(&self) -> bool {
        self.boundary.is_some()
    }

    pub fn supports(&self, provider: Provider) -> bool {
        self.providers.contains(&provider)
    }

    /// Directory holding the unit's runtime code, relative to its layer directory
    pub fn source_dir(&self) -> &'static str {
        self.directory.unwrap_or(self.name)
    }
}

/// A catalog entry resolved against a configuration, bound to a device for
/// per-device units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployableUnit {
    pub definition: FunctionDefinition,
    pub device: Option<DeviceId>,
}

impl DeployableUnit {
    pub fn new(definition: FunctionDefinition) -> Self {
        Self {
            definition,
            device: None,
        }
    }

    pub fn for_device(definition: FunctionDefinition, device: DeviceId) -> Self {
        Self {
            definition,
            device: Some(device),
        }
    }

    pub fn name(&self) -> &'static str {
        self.definition.name
    }

    pub fn layer(&self) -> MacroLayer {
        self.definition.layer
    }

    /// Identifier unique within a layer, e.g. `processor-sensor-1`
    pub fn id(&self) -> String {
        match &self.device {
            Some(device) => format!("{}-{}", self.definition.name, device),
            None => self.definition.name.to_string(),
        }
    }
}

impl fmt::Display for DeployableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.device {
            Some(device) => write!(f, "{} ({})", self.definition.name, device),
            None => f.write_str(self.definition.name),
        }
    }
}
