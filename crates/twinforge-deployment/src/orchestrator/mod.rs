//! Layer orchestrators
//!
//! One orchestrator per macro-layer, each with deploy / destroy / info.
//! Orchestrators only describe *what* a layer owns (its [`LayerPlan`]);
//! applying, observing and tearing down a plan is shared.

pub mod acquisition;
pub mod glue;
pub mod plan;
pub mod preflight;
pub mod processing;
pub mod setup;
pub mod storage;
pub mod twin;
pub mod visualization;

pub use acquisition::AcquisitionOrchestrator;
pub use glue::GlueOrchestrator;
pub use plan::{LayerPlan, Step};
pub use processing::ProcessingOrchestrator;
pub use setup::SetupOrchestrator;
pub use storage::{StorageOrchestrator, StorageTier};
pub use twin::TwinOrchestrator;
pub use visualization::VisualizationOrchestrator;

use crate::adapter::UnitSpec;
use crate::context::DeploymentContext;
use crate::error::Result;
use crate::info::LayerInfo;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use twinforge_catalog::DeployableUnit;
use twinforge_naming::ResourceKind;
use twinforge_types::{Boundary, DeviceId, MacroLayer, Provider};

/// Deploy, destroy and inspect one macro-layer on one provider
#[async_trait]
pub trait LayerOrchestrator: Send + Sync {
    fn layer(&self) -> MacroLayer;

    /// Resources the layer owns on `provider`, in deploy order. Never
    /// touches the control plane.
    async fn plan(&self, ctx: &DeploymentContext, provider: Provider) -> Result<LayerPlan>;

    /// Pre-flight, then create whatever is absent
    async fn deploy(&self, ctx: &DeploymentContext, provider: Provider) -> Result<()> {
        preflight::check(ctx, self.layer(), provider).await?;
        self.plan(ctx, provider).await?.apply(ctx).await
    }

    /// Best-effort teardown in reverse deploy order
    async fn destroy(&self, ctx: &DeploymentContext, provider: Provider) -> Result<()> {
        self.plan(ctx, provider).await?.teardown(ctx).await
    }

    async fn info(&self, ctx: &DeploymentContext, provider: Provider) -> Result<LayerInfo> {
        self.plan(ctx, provider).await?.observe(ctx).await
    }
}

/// Factory for layer orchestrators
pub fn orchestrator_for(layer: MacroLayer) -> Arc<dyn LayerOrchestrator> {
    match layer {
        MacroLayer::Setup => Arc::new(SetupOrchestrator),
        MacroLayer::L0 => Arc::new(GlueOrchestrator),
        MacroLayer::L1 => Arc::new(AcquisitionOrchestrator),
        MacroLayer::L2 => Arc::new(ProcessingOrchestrator),
        MacroLayer::L3Hot => Arc::new(StorageOrchestrator::new(StorageTier::Hot)),
        MacroLayer::L3Cold => Arc::new(StorageOrchestrator::new(StorageTier::Cold)),
        MacroLayer::L3Archive => Arc::new(StorageOrchestrator::new(StorageTier::Archive)),
        MacroLayer::L4 => Arc::new(TwinOrchestrator),
        MacroLayer::L5 => Arc::new(VisualizationOrchestrator),
    }
}

// --- Plan building helpers ---

/// Name of the resource group every role on `provider` is assigned to
pub(crate) fn scope(ctx: &DeploymentContext, provider: Provider) -> Result<String> {
    ctx.name(provider, setup::RESOURCE_GROUP, None, ResourceKind::ResourceGroup)
}

pub(crate) fn new_plan(ctx: &DeploymentContext, layer: MacroLayer, provider: Provider) -> Result<LayerPlan> {
    Ok(LayerPlan::new(layer, provider, scope(ctx, provider)?))
}

pub(crate) fn role_step(ctx: &DeploymentContext, provider: Provider, component: &str) -> Result<Step> {
    Ok(Step::Role {
        component: component.to_string(),
        name: ctx.name(provider, component, None, ResourceKind::Role)?,
    })
}

pub(crate) fn storage_step(ctx: &DeploymentContext, provider: Provider, component: &str) -> Result<Step> {
    Ok(Step::Storage {
        component: component.to_string(),
        name: ctx.name(provider, component, None, ResourceKind::StorageContainer)?,
    })
}

pub(crate) fn resource_step(
    ctx: &DeploymentContext,
    provider: Provider,
    component: &str,
    kind: ResourceKind,
    properties: serde_json::Value,
) -> Result<Step> {
    Ok(Step::Resource {
        component: component.to_string(),
        kind,
        name: ctx.name(provider, component, None, kind)?,
        device: None,
        properties,
    })
}

/// One resource per configured device, component `{component}-{device}`
pub(crate) fn device_steps(
    ctx: &DeploymentContext,
    provider: Provider,
    component: &str,
    kind: ResourceKind,
    properties: impl Fn(&DeviceId) -> serde_json::Value,
) -> Result<Vec<Step>> {
    ctx.config()
        .device_ids()
        .map(|device| {
            Ok(Step::Resource {
                component: format!("{component}-{device}"),
                kind,
                name: ctx.name(provider, component, Some(device), kind)?,
                device: Some(device.clone()),
                properties: properties(device),
            })
        })
        .collect()
}

pub(crate) fn unit_step(
    ctx: &DeploymentContext,
    provider: Provider,
    unit: &DeployableUnit,
    role: &Step,
    environment: BTreeMap<String, String>,
    public: bool,
) -> Result<Step> {
    let name = unit_name(ctx, provider, unit.name(), unit.device.as_ref())?;
    Ok(Step::Unit {
        component: unit.id(),
        unit_id: unit.id(),
        spec: UnitSpec {
            name,
            role: role.name().to_string(),
            environment,
            public,
        },
    })
}

pub(crate) fn unit_name(
    ctx: &DeploymentContext,
    provider: Provider,
    unit: &str,
    device: Option<&DeviceId>,
) -> Result<String> {
    ctx.name(provider, unit, device, ResourceKind::Function)
}

/// Point a unit at the next stage across `boundary`.
///
/// Crossed: `{prefix}_URL` and `{prefix}_TOKEN` from the boundary's
/// connection record, omitted while no record exists (pre-flight catches
/// that before deploy). Not crossed: `{prefix}_TARGET` names the local
/// resource.
pub(crate) async fn link_environment(
    ctx: &DeploymentContext,
    environment: &mut BTreeMap<String, String>,
    boundary: Boundary,
    prefix: &str,
    local_target: impl FnOnce() -> Result<String> + Send,
) -> Result<()> {
    if ctx.resolver().is_crossed(boundary) {
        if let Some(connection) = ctx.connections().get(boundary).await? {
            environment.insert(format!("{prefix}_URL"), connection.url);
            environment.insert(format!("{prefix}_TOKEN"), connection.token);
        }
    } else {
        environment.insert(format!("{prefix}_TARGET"), local_target()?);
    }
    Ok(())
}

/// Catalog units `provider` hosts in `layer`
pub(crate) fn layer_units(
    ctx: &DeploymentContext,
    provider: Provider,
    layer: MacroLayer,
) -> Result<Vec<DeployableUnit>> {
    Ok(ctx.catalog().resolve_for_layer(ctx.config(), provider, layer)?)
}
