//! Shared fixtures for unit tests

use crate::context::DeploymentContext;
use crate::memory::InMemoryControlPlane;
use crate::orchestrator::orchestrator_for;
use crate::settings::DeployerSettings;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;
use twinforge_catalog::FunctionCatalog;
use twinforge_package::scaffold_sources;
use twinforge_types::{DeviceConfig, DeviceId, MacroLayer, ProjectConfig, Provider, TwinName};

pub(crate) struct Harness {
    _dir: TempDir,
    pub ctx: DeploymentContext,
    planes: BTreeMap<Provider, Arc<InMemoryControlPlane>>,
}

impl Harness {
    /// Scaffolded project on in-memory control planes
    pub fn new(config: ProjectConfig) -> Self {
        let dir = TempDir::new().unwrap();
        scaffold_sources(dir.path(), &FunctionCatalog::standard(), &config).unwrap();

        let planes: BTreeMap<_, _> = config
            .providers_in_use()
            .into_iter()
            .map(|p| (p, Arc::new(InMemoryControlPlane::new(p))))
            .collect();

        let mut builder = DeploymentContext::builder(dir.path(), config)
            .with_settings(DeployerSettings::immediate());
        for plane in planes.values() {
            builder = builder.with_adapter(plane.clone());
        }

        Self {
            ctx: builder.build().unwrap(),
            _dir: dir,
            planes,
        }
    }

    pub fn single(provider: Provider) -> Self {
        Self::new(config(provider))
    }

    pub fn plane(&self, provider: Provider) -> &InMemoryControlPlane {
        &self.planes[&provider]
    }

    /// Deploy every layer before `layer`, on every target
    pub async fn deploy_before(&self, layer: MacroLayer) {
        for previous in MacroLayer::DEPLOY_ORDER
            .iter()
            .take_while(|l| **l != layer)
        {
            for provider in self.ctx.targets(*previous) {
                orchestrator_for(*previous)
                    .deploy(&self.ctx, provider)
                    .await
                    .unwrap();
            }
        }
    }
}

/// Two devices, no optional features
pub(crate) fn config(provider: Provider) -> ProjectConfig {
    ProjectConfig::single_provider(TwinName::new("plant").unwrap(), provider)
        .with_device(DeviceConfig::new(DeviceId::new("s1").unwrap()))
        .with_device(DeviceConfig::new(DeviceId::new("s2").unwrap()))
}
