//! The function catalog

use crate::boundary::BoundaryResolver;
use crate::definition::{DeployableUnit, FunctionDefinition};
use crate::outputs::OutputMap;
use tracing::debug;
use twinforge_types::{Boundary, FeatureFlag, MacroLayer, ProjectConfig, Provider, Result};

const ALL: &[Provider] = &Provider::ALL;
const TWIN_CAPABLE: &[Provider] = &[Provider::Aws, Provider::Azure];

/// Every unit the pipeline knows how to deploy
static DEFINITIONS: &[FunctionDefinition] = &[
    // L0: cross-cloud glue, hosted on the target side of a crossed boundary
    FunctionDefinition::glue("ingestion", Boundary::L1ToL2, ALL),
    FunctionDefinition::glue("hot-writer", Boundary::L2ToL3Hot, ALL),
    FunctionDefinition::glue("cold-writer", Boundary::L3HotToL3Cold, ALL),
    FunctionDefinition::glue("archive-writer", Boundary::L3ColdToL3Archive, ALL),
    FunctionDefinition::glue("digital-twin-data-connector", Boundary::L3HotToL4, TWIN_CAPABLE),
    FunctionDefinition::glue(
        "digital-twin-data-connector-last-entry",
        Boundary::L3HotToL4,
        TWIN_CAPABLE,
    ),
    FunctionDefinition::glue("dashboard-data-connector", Boundary::L3HotToL5, TWIN_CAPABLE),
    // L1: acquisition
    FunctionDefinition::new("dispatcher", MacroLayer::L1, ALL),
    // L2: processing
    FunctionDefinition::new("persister", MacroLayer::L2, ALL),
    FunctionDefinition::new("processor", MacroLayer::L2, ALL)
        .per_device()
        .in_directory("processors"),
    FunctionDefinition::new("event-checker", MacroLayer::L2, ALL)
        .gated(FeatureFlag::UseEventChecking),
    FunctionDefinition::new("event-feedback", MacroLayer::L2, ALL)
        .gated(FeatureFlag::ReturnFeedbackToDevice),
    FunctionDefinition::new("event-notifier", MacroLayer::L2, ALL)
        .gated(FeatureFlag::TriggerNotificationWorkflow),
    // L3: storage tiers
    FunctionDefinition::new("hot-reader", MacroLayer::L3Hot, ALL),
    FunctionDefinition::new("hot-reader-last-entry", MacroLayer::L3Hot, ALL),
    FunctionDefinition::new("hot-to-cold-mover", MacroLayer::L3Hot, ALL),
    FunctionDefinition::new("cold-to-archive-mover", MacroLayer::L3Cold, ALL),
    // L4: twin management
    FunctionDefinition::new("twin-updater", MacroLayer::L4, TWIN_CAPABLE),
];

/// Static registry of deployable units.
///
/// All lookups are pure filters over the registered definitions.
#[derive(Debug, Clone)]
pub struct FunctionCatalog {
    definitions: Vec<FunctionDefinition>,
}

impl FunctionCatalog {
    /// The catalog shipped with the deployer
    pub fn standard() -> Self {
        Self::new(DEFINITIONS.to_vec())
    }

    pub fn new(definitions: Vec<FunctionDefinition>) -> Self {
        Self { definitions }
    }

    pub fn definitions(&self) -> &[FunctionDefinition] {
        &self.definitions
    }

    pub fn get(&self, layer: MacroLayer, name: &str) -> Option<&FunctionDefinition> {
        self.definitions
            .iter()
            .find(|d| d.layer == layer && d.name == name)
    }

    pub fn get_by_layer(&self, layer: MacroLayer) -> Vec<&FunctionDefinition> {
        self.definitions.iter().filter(|d| d.layer == layer).collect()
    }

    pub fn get_by_provider(&self, provider: Provider) -> Vec<&FunctionDefinition> {
        self.definitions
            .iter()
            .filter(|d| d.supports(provider))
            .collect()
    }

    pub fn get_by_boundary(&self, boundary: Boundary) -> Vec<&FunctionDefinition> {
        self.definitions
            .iter()
            .filter(|d| d.boundary == Some(boundary))
            .collect()
    }

    /// Glue definitions `target_provider` must host for `config`
    pub fn glue_for_config(
        &self,
        config: &ProjectConfig,
        target_provider: Provider,
    ) -> Result<Vec<&FunctionDefinition>> {
        let resolver = BoundaryResolver::new(config)?;
        let hosted = resolver.hosted_by(target_provider);

        Ok(self
            .definitions
            .iter()
            .filter(|d| match d.boundary {
                Some(boundary) => hosted.contains(&boundary) && d.supports(target_provider),
                None => false,
            })
            .collect())
    }

    /// Names of the glue units `target_provider` must host for `config`.
    ///
    /// For each adjacency whose two sides are assigned different providers
    /// and whose target side is `target_provider`, the boundary's registered
    /// glue is included. A single-provider configuration yields nothing.
    pub fn get_l0_for_config(
        &self,
        config: &ProjectConfig,
        target_provider: Provider,
    ) -> Result<Vec<&'static str>> {
        let names: Vec<_> = self
            .glue_for_config(config, target_provider)?
            .into_iter()
            .map(|d| d.name)
            .collect();

        debug!(
            provider = %target_provider,
            glue = ?names,
            "Resolved L0 glue"
        );

        Ok(names)
    }

    /// Every unit `provider` hosts for `config`.
    ///
    /// Layer units follow the slot assignment, gated units appear iff their
    /// flag is on, per-device units are expanded once per device, and glue
    /// comes from the boundary algorithm.
    pub fn resolve_for_provider(
        &self,
        config: &ProjectConfig,
        provider: Provider,
    ) -> Result<Vec<DeployableUnit>> {
        let glue = self.glue_for_config(config, provider)?;
        let mut units = Vec::new();

        for definition in &self.definitions {
            let hosted = match definition.layer.slot() {
                Some(slot) => config.provider(slot)? == provider && definition.supports(provider),
                None => glue.iter().any(|g| g.name == definition.name),
            };
            if !hosted {
                continue;
            }
            if let Some(flag) = definition.feature {
                if !config.is_enabled(flag) {
                    continue;
                }
            }

            if definition.per_device {
                units.extend(
                    config
                        .device_ids()
                        .map(|id| DeployableUnit::for_device(*definition, id.clone())),
                );
            } else {
                units.push(DeployableUnit::new(*definition));
            }
        }

        Ok(units)
    }

    /// Units `provider` hosts within one macro-layer
    pub fn resolve_for_layer(
        &self,
        config: &ProjectConfig,
        provider: Provider,
        layer: MacroLayer,
    ) -> Result<Vec<DeployableUnit>> {
        Ok(self
            .resolve_for_provider(config, provider)?
            .into_iter()
            .filter(|u| u.layer() == layer)
            .collect())
    }

    /// Output-key → logical-key map for discovering deployed identifiers
    pub fn get_terraform_output_map(
        &self,
        provider: Provider,
        layer: Option<MacroLayer>,
    ) -> OutputMap {
        OutputMap::build(
            provider,
            self.definitions
                .iter()
                .filter(|d| d.supports(provider))
                .filter(|d| layer.map_or(true, |l| d.layer == l)),
        )
    }
}

impl Default for FunctionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
