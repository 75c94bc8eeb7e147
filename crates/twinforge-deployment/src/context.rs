//! Deployment Context - Everything an orchestrator call needs
//!
//! The context is built once per invocation and threaded explicitly through
//! every orchestrator call. Provider handles live here, not in globals.

use crate::adapter::{CloudError, ProviderAdapter};
use crate::connections::{ConnectionStore, InMemoryConnectionStore};
use crate::error::{DeployError, Result};
use crate::memory::InMemoryControlPlane;
use crate::settings::DeployerSettings;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use twinforge_catalog::{BoundaryResolver, FunctionCatalog};
use twinforge_naming::{NamingScheme, ResourceKind};
use twinforge_package::ArtifactPackager;
use twinforge_resilience::{ResilientExecutor, TransientClassifier};
use twinforge_types::{DeviceId, LayerSlot, MacroLayer, ProjectConfig, Provider};

/// A provider's adapter together with its naming scheme and classifier
#[derive(Clone)]
pub struct ProviderHandle {
    adapter: Arc<dyn ProviderAdapter>,
    naming: Arc<dyn NamingScheme>,
    classifier: Arc<dyn TransientClassifier<CloudError>>,
}

impl ProviderHandle {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            naming: adapter.naming(),
            classifier: adapter.transient_classifier(),
            adapter,
        }
    }

    pub fn provider(&self) -> Provider {
        self.adapter.provider()
    }

    pub fn adapter(&self) -> &dyn ProviderAdapter {
        self.adapter.as_ref()
    }

    pub fn naming(&self) -> &dyn NamingScheme {
        self.naming.as_ref()
    }

    pub fn classifier(&self) -> &dyn TransientClassifier<CloudError> {
        self.classifier.as_ref()
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("provider", &self.provider())
            .finish()
    }
}

/// Context provided to layer orchestrators
pub struct DeploymentContext {
    project_path: PathBuf,
    config: ProjectConfig,
    resolver: BoundaryResolver,
    catalog: FunctionCatalog,
    packager: ArtifactPackager,
    providers: BTreeMap<Provider, ProviderHandle>,
    connections: Arc<dyn ConnectionStore>,
    settings: DeployerSettings,
    executor: ResilientExecutor,
}

impl DeploymentContext {
    pub fn builder(project_path: impl Into<PathBuf>, config: ProjectConfig) -> DeploymentContextBuilder {
        DeploymentContextBuilder {
            project_path: project_path.into(),
            config,
            catalog: FunctionCatalog::standard(),
            adapters: Vec::new(),
            connections: None,
            settings: DeployerSettings::default(),
        }
    }

    /// A context backed by in-memory control planes for every provider in use
    pub fn dry_run(project_path: impl Into<PathBuf>, config: ProjectConfig) -> Result<Self> {
        let mut builder = Self::builder(project_path, config.clone())
            .with_settings(DeployerSettings::immediate());
        for provider in config.providers_in_use() {
            builder = builder.with_adapter(Arc::new(InMemoryControlPlane::new(provider)));
        }
        builder.build()
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn resolver(&self) -> &BoundaryResolver {
        &self.resolver
    }

    pub fn catalog(&self) -> &FunctionCatalog {
        &self.catalog
    }

    pub fn packager(&self) -> &ArtifactPackager {
        &self.packager
    }

    pub fn connections(&self) -> &dyn ConnectionStore {
        self.connections.as_ref()
    }

    pub fn settings(&self) -> &DeployerSettings {
        &self.settings
    }

    pub fn executor(&self) -> &ResilientExecutor {
        &self.executor
    }

    pub fn handle(&self, provider: Provider) -> Result<&ProviderHandle> {
        self.providers
            .get(&provider)
            .ok_or(DeployError::MissingAdapter(provider))
    }

    /// Provider assigned to a slot
    pub fn provider(&self, slot: LayerSlot) -> Provider {
        self.resolver.provider(slot)
    }

    /// Providers a macro-layer runs on: every provider in use for Setup and
    /// L0, the assigned provider otherwise
    pub fn targets(&self, layer: MacroLayer) -> Vec<Provider> {
        match layer.slot() {
            Some(slot) => vec![self.provider(slot)],
            None => self.config.providers_in_use().into_iter().collect(),
        }
    }

    /// Deterministic resource name for `provider`
    pub fn name(
        &self,
        provider: Provider,
        component: &str,
        device: Option<&DeviceId>,
        kind: ResourceKind,
    ) -> Result<String> {
        Ok(self
            .handle(provider)?
            .naming()
            .name(&self.config.twin_name, component, device, kind))
    }
}

impl std::fmt::Debug for DeploymentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentContext")
            .field("project_path", &self.project_path)
            .field("twin", &self.config.twin_name)
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`DeploymentContext`]
pub struct DeploymentContextBuilder {
    project_path: PathBuf,
    config: ProjectConfig,
    catalog: FunctionCatalog,
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    connections: Option<Arc<dyn ConnectionStore>>,
    settings: DeployerSettings,
}

impl DeploymentContextBuilder {
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn with_connection_store(mut self, store: Arc<dyn ConnectionStore>) -> Self {
        self.connections = Some(store);
        self
    }

    pub fn with_settings(mut self, settings: DeployerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_catalog(mut self, catalog: FunctionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Validate the configuration and check every provider in use has an
    /// adapter. Without an explicit store, connections are kept in memory,
    /// seeded from the configuration's persisted records.
    pub fn build(self) -> Result<DeploymentContext> {
        self.config.validate()?;
        let resolver = BoundaryResolver::new(&self.config)?;

        let providers: BTreeMap<_, _> = self
            .adapters
            .into_iter()
            .map(|a| (a.provider(), ProviderHandle::new(a)))
            .collect();
        if let Some(missing) = self
            .config
            .providers_in_use()
            .into_iter()
            .find(|p| !providers.contains_key(p))
        {
            return Err(DeployError::MissingAdapter(missing));
        }

        let connections = self.connections.unwrap_or_else(|| {
            Arc::new(InMemoryConnectionStore::seeded(&self.config.inter_cloud))
        });

        Ok(DeploymentContext {
            project_path: self.project_path,
            executor: ResilientExecutor::new(self.settings.retry_policy()),
            packager: ArtifactPackager::new(self.catalog.clone()),
            catalog: self.catalog,
            config: self.config,
            resolver,
            providers,
            connections,
            settings: self.settings,
        })
    }
}
