//! Layer plans
//!
//! A plan is the ordered list of resources one layer owns on one provider.
//! Deploying applies it front to back, info describes every step, and
//! destroy deletes it back to front.

use crate::adapter::{CloudError, ResourceHandle, UnitSpec};
use crate::context::{DeploymentContext, ProviderHandle};
use crate::error::{DeployError, Result};
use crate::info::LayerInfo;
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};
use twinforge_naming::ResourceKind;
use twinforge_package::{ApplicationId, Bundle, PackagingPolicy};
use twinforge_resilience::{wait_for_propagation, wait_for_warmup, RetryError};
use twinforge_types::{DeviceId, MacroLayer, Provider};

/// One resource in a layer plan
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Created if absent, then assigned to the provider's resource group
    Role { component: String, name: String },
    Storage { component: String, name: String },
    Resource {
        component: String,
        kind: ResourceKind,
        name: String,
        /// Per-device resources are created concurrently
        device: Option<DeviceId>,
        properties: serde_json::Value,
    },
    Unit {
        component: String,
        /// Catalog unit id, used to find the unit's artifact
        unit_id: String,
        spec: UnitSpec,
    },
}

impl Step {
    pub fn component(&self) -> &str {
        match self {
            Step::Role { component, .. }
            | Step::Storage { component, .. }
            | Step::Resource { component, .. }
            | Step::Unit { component, .. } => component,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Step::Role { .. } => ResourceKind::Role,
            Step::Storage { .. } => ResourceKind::StorageContainer,
            Step::Resource { kind, .. } => *kind,
            Step::Unit { .. } => ResourceKind::Function,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Step::Role { name, .. } | Step::Storage { name, .. } | Step::Resource { name, .. } => {
                name
            }
            Step::Unit { spec, .. } => &spec.name,
        }
    }

    fn is_unit(&self) -> bool {
        matches!(self, Step::Unit { .. })
    }

    fn is_device_resource(&self) -> bool {
        matches!(self, Step::Resource { device: Some(_), .. })
    }
}

/// The resources of one layer on one provider, in deploy order
#[derive(Debug, Clone)]
pub struct LayerPlan {
    pub layer: MacroLayer,
    pub provider: Provider,
    /// Scope roles are assigned to
    pub scope: String,
    pub steps: Vec<Step>,
}

impl LayerPlan {
    pub fn new(layer: MacroLayer, provider: Provider, scope: String) -> Self {
        Self {
            layer,
            provider,
            scope,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn extend(&mut self, steps: impl IntoIterator<Item = Step>) {
        self.steps.extend(steps);
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, component: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.component() == component)
    }

    /// Create everything that is absent. Safe to re-run after an
    /// interrupted deploy.
    #[instrument(skip_all, fields(layer = %self.layer, provider = %self.provider))]
    pub async fn apply(&self, ctx: &DeploymentContext) -> Result<()> {
        let handle = ctx.handle(self.provider)?;
        let bundle = self.package(ctx).await?;

        info!(steps = self.steps.len(), "Deploying layer");

        let mut i = 0;
        while i < self.steps.len() {
            let step = &self.steps[i];
            if step.is_unit() || step.is_device_resource() {
                let batch_is_units = step.is_unit();
                let end = self.steps[i..]
                    .iter()
                    .position(|s| {
                        if batch_is_units {
                            !s.is_unit()
                        } else {
                            !s.is_device_resource()
                        }
                    })
                    .map_or(self.steps.len(), |offset| i + offset);

                if batch_is_units {
                    self.deploy_units(ctx, handle, &self.steps[i..end], bundle.as_ref())
                        .await?;
                } else {
                    let results =
                        join_all(self.steps[i..end].iter().map(|s| self.ensure(ctx, handle, s)))
                            .await;
                    results.into_iter().collect::<Result<Vec<_>>>()?;
                }
                i = end;
            } else {
                self.ensure(ctx, handle, step).await?;
                i += 1;
            }
        }

        info!("Layer deployed");
        Ok(())
    }

    /// Delete every step in reverse order. Absent resources count as
    /// deleted; other failures are collected and teardown continues.
    #[instrument(skip_all, fields(layer = %self.layer, provider = %self.provider))]
    pub async fn teardown(&self, ctx: &DeploymentContext) -> Result<()> {
        let handle = ctx.handle(self.provider)?;
        let adapter = handle.adapter();
        let mut failures = Vec::new();

        for step in self.steps.iter().rev() {
            let kind = step.kind();
            let name = step.name();
            let result = ctx
                .executor()
                .execute(
                    "delete_resource",
                    move || adapter.delete_resource(kind, name),
                    handle.classifier(),
                )
                .await;

            match result {
                Ok(()) => debug!(kind = %kind, name, "Deleted"),
                Err(RetryError::Fatal { error, .. }) if error.is_not_found() => {
                    debug!(kind = %kind, name, "Already absent");
                }
                Err(e) => {
                    warn!(kind = %kind, name, error = %e, "Delete failed, continuing");
                    failures.push(format!("{kind} {name}: {e}"));
                }
            }
        }

        if failures.is_empty() {
            info!("Layer destroyed");
            Ok(())
        } else {
            Err(DeployError::Destroy {
                layer: self.layer,
                provider: self.provider,
                failures,
            })
        }
    }

    /// Describe every step against the live control plane
    pub async fn observe(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let handle = ctx.handle(self.provider)?;
        let mut info = LayerInfo::new(self.layer, self.provider);
        for step in &self.steps {
            let present = self.describe(ctx, handle, step).await?.is_some();
            info.push(step.component(), step.name(), present);
        }
        Ok(info)
    }

    async fn package(&self, ctx: &DeploymentContext) -> Result<Option<Bundle>> {
        if !self.steps.iter().any(Step::is_unit) {
            return Ok(None);
        }
        let Some(application) = ApplicationId::for_layer(self.layer) else {
            return Ok(None);
        };
        Ok(ctx
            .packager()
            .build_bundle_async(
                self.provider,
                application,
                ctx.project_path().to_path_buf(),
                ctx.config().clone(),
            )
            .await?)
    }

    async fn describe(
        &self,
        ctx: &DeploymentContext,
        handle: &ProviderHandle,
        step: &Step,
    ) -> Result<Option<ResourceHandle>> {
        describe(ctx, handle, self.layer, step.kind(), step.name()).await
    }

    /// Create a non-unit step if it does not exist yet
    async fn ensure(&self, ctx: &DeploymentContext, handle: &ProviderHandle, step: &Step) -> Result<()> {
        let exists = self.describe(ctx, handle, step).await?.is_some();
        // Roles are re-assigned even when present
        if exists && !matches!(step, Step::Role { .. }) {
            debug!(component = step.component(), "Already present");
            return Ok(());
        }

        let adapter = handle.adapter();
        let executor = ctx.executor();
        let classifier = handle.classifier();

        match step {
            Step::Role { name, .. } => {
                if !exists {
                    executor
                        .execute("create_role", move || adapter.create_role(name), classifier)
                        .await
                        .map_err(|e| self.failed(format!("create_role {name}"), e))?;
                }

                let scope = self.scope.as_str();
                executor
                    .execute("assign_role", move || adapter.assign_role(name, scope), classifier)
                    .await
                    .map_err(|e| self.failed(format!("assign_role {name}"), e))?;

                if !exists {
                    wait_for_propagation(ctx.settings().propagation_wait()).await;
                }
            }
            Step::Storage { name, .. } => {
                executor
                    .execute(
                        "create_storage_container",
                        move || adapter.create_storage_container(name),
                        classifier,
                    )
                    .await
                    .map_err(|e| self.failed(format!("create_storage_container {name}"), e))?;
            }
            Step::Resource {
                kind,
                name,
                properties,
                ..
            } => {
                let kind = *kind;
                executor
                    .execute(
                        "create_resource",
                        move || adapter.create_resource(kind, name, properties),
                        classifier,
                    )
                    .await
                    .map_err(|e| self.failed(format!("create_resource {kind} {name}"), e))?;
            }
            // Deployed in batches by `deploy_units`
            Step::Unit { .. } => return Ok(()),
        }

        info!(component = step.component(), name = step.name(), "Created");
        Ok(())
    }

    /// Create units concurrently, then upload their code and wait for warm-up
    async fn deploy_units(
        &self,
        ctx: &DeploymentContext,
        handle: &ProviderHandle,
        steps: &[Step],
        bundle: Option<&Bundle>,
    ) -> Result<()> {
        let adapter = handle.adapter();
        let executor = ctx.executor();
        let classifier = handle.classifier();

        let units: Vec<(&str, &UnitSpec)> = steps
            .iter()
            .filter_map(|s| match s {
                Step::Unit { unit_id, spec, .. } => Some((unit_id.as_str(), spec)),
                _ => None,
            })
            .collect();

        let created = join_all(units.iter().map(|(_, spec)| {
            let spec: &UnitSpec = spec;
            async move {
                executor
                    .execute("create_unit", move || adapter.create_unit(spec), classifier)
                    .await
                    .map_err(|e| self.failed(format!("create_unit {}", spec.name), e))
            }
        }))
        .await;
        created.into_iter().collect::<Result<Vec<_>>>()?;

        let Some(bundle) = bundle else {
            return Ok(());
        };

        let unit_ids: Vec<&str> = units.iter().map(|(id, _)| *id).collect();
        let uploads = bundle.uploads(&unit_ids);
        if uploads.len() < unit_ids.len() && bundle.policy == PackagingPolicy::PerUnit {
            warn!(
                units = unit_ids.len(),
                artifacts = uploads.len(),
                "Some units have no artifact"
            );
        }

        for (unit_id, artifact) in uploads {
            let Some((_, spec)) = units.iter().find(|(id, _)| *id == unit_id) else {
                continue;
            };
            let name = spec.name.as_str();
            executor
                .execute("upload_code", move || adapter.upload_code(name, artifact), classifier)
                .await
                .map_err(|e| self.failed(format!("upload_code {name}"), e))?;
        }

        info!(units = units.len(), "Units deployed");
        wait_for_warmup(ctx.settings().warmup()).await;
        Ok(())
    }

    fn failed(&self, operation: String, source: RetryError<CloudError>) -> DeployError {
        DeployError::Deployment {
            layer: self.layer,
            provider: self.provider,
            operation,
            source,
        }
    }
}

/// Look a resource up through the executor
pub(crate) async fn describe(
    ctx: &DeploymentContext,
    handle: &ProviderHandle,
    layer: MacroLayer,
    kind: ResourceKind,
    name: &str,
) -> Result<Option<ResourceHandle>> {
    let adapter = handle.adapter();
    ctx.executor()
        .execute(
            "describe_resource",
            move || adapter.describe_resource(kind, name),
            handle.classifier(),
        )
        .await
        .map_err(|source| DeployError::Deployment {
            layer,
            provider: handle.provider(),
            operation: format!("describe {kind} {name}"),
            source,
        })
}

/// Environment shared by every unit
pub(crate) fn base_environment(ctx: &DeploymentContext, provider: Provider) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("TWIN_NAME".to_string(), ctx.config().twin_name.to_string()),
        ("PROVIDER".to_string(), provider.to_string()),
    ])
}
