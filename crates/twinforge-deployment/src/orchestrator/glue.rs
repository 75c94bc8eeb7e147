//! L0: cross-cloud glue
//!
//! For every crossed boundary whose target side is this provider, the
//! boundary's glue units are deployed behind a public endpoint and an
//! [`InterCloudConnection`] (endpoint + shared token) is recorded so the
//! source side can reach them. A connection is reused for as long as its
//! primary glue unit exists; tokens are only minted for new glue.

use super::plan::{base_environment, describe};
use super::processing::PERSISTER;
use super::storage::StorageTier;
use super::twin::TWIN_GRAPH;
use super::visualization::DASHBOARD;
use super::{
    layer_units, new_plan, preflight, role_step, unit_name, unit_step, LayerOrchestrator,
    LayerPlan,
};
use crate::connections::generate_token;
use crate::context::DeploymentContext;
use crate::error::{DeployError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};
use twinforge_catalog::FunctionDefinition;
use twinforge_naming::ResourceKind;
use twinforge_types::{Boundary, InterCloudConnection, MacroLayer, Provider};

pub const GLUE_ROLE: &str = "glue-role";

#[derive(Debug, Clone, Copy, Default)]
pub struct GlueOrchestrator;

impl GlueOrchestrator {
    /// Plan with the given token per boundary
    fn plan_with_tokens(
        &self,
        ctx: &DeploymentContext,
        provider: Provider,
        tokens: &BTreeMap<Boundary, String>,
    ) -> Result<LayerPlan> {
        let mut plan = new_plan(ctx, MacroLayer::L0, provider)?;
        let units = layer_units(ctx, provider, MacroLayer::L0)?;
        if units.is_empty() {
            return Ok(plan);
        }

        let role = role_step(ctx, provider, GLUE_ROLE)?;
        plan.push(role.clone());

        for unit in &units {
            let Some(boundary) = unit.definition.boundary else {
                continue;
            };
            let mut env = base_environment(ctx, provider);
            env.insert("BOUNDARY".into(), boundary.key().into());
            env.insert("TARGET".into(), local_target(ctx, provider, boundary)?);
            if let Some(token) = tokens.get(&boundary) {
                env.insert("INTER_CLOUD_TOKEN".into(), token.clone());
            }
            plan.push(unit_step(ctx, provider, unit, &role, env, true)?);
        }
        Ok(plan)
    }

    async fn stored_tokens(
        &self,
        ctx: &DeploymentContext,
        provider: Provider,
    ) -> Result<BTreeMap<Boundary, String>> {
        let mut tokens = BTreeMap::new();
        for boundary in ctx.resolver().hosted_by(provider) {
            if let Some(connection) = ctx.connections().get(boundary).await? {
                tokens.insert(boundary, connection.token);
            }
        }
        Ok(tokens)
    }

    /// Whether the boundary's primary glue unit currently exists
    async fn glue_exists(
        &self,
        ctx: &DeploymentContext,
        provider: Provider,
        primary: &FunctionDefinition,
    ) -> Result<bool> {
        Ok(self.glue_endpoint(ctx, provider, primary).await?.is_some())
    }

    /// `Some(endpoint)` of the primary glue unit, `Some("")` when it exists
    /// without an endpoint
    async fn glue_endpoint(
        &self,
        ctx: &DeploymentContext,
        provider: Provider,
        primary: &FunctionDefinition,
    ) -> Result<Option<String>> {
        let handle = ctx.handle(provider)?;
        let name = unit_name(ctx, provider, primary.name, None)?;
        Ok(describe(ctx, handle, MacroLayer::L0, ResourceKind::Function, &name)
            .await?
            .map(|r| r.endpoint.unwrap_or_default()))
    }

    /// Drop the boundary's connection record once its primary glue is gone
    async fn release_connection(
        &self,
        ctx: &DeploymentContext,
        provider: Provider,
        boundary: Boundary,
        primary: &FunctionDefinition,
    ) -> Result<()> {
        if !self.glue_exists(ctx, provider, primary).await? {
            ctx.connections().remove(boundary).await?;
            debug!(boundary = boundary.key(), "Inter-cloud connection removed");
        }
        Ok(())
    }
}

#[async_trait]
impl LayerOrchestrator for GlueOrchestrator {
    fn layer(&self) -> MacroLayer {
        MacroLayer::L0
    }

    async fn plan(&self, ctx: &DeploymentContext, provider: Provider) -> Result<LayerPlan> {
        let tokens = self.stored_tokens(ctx, provider).await?;
        self.plan_with_tokens(ctx, provider, &tokens)
    }

    #[instrument(skip_all, fields(provider = %provider))]
    async fn deploy(&self, ctx: &DeploymentContext, provider: Provider) -> Result<()> {
        preflight::check(ctx, MacroLayer::L0, provider).await?;

        let mut tokens = BTreeMap::new();
        let mut minted = Vec::new();
        for boundary in ctx.resolver().hosted_by(provider) {
            let Some(primary) = primary_glue(ctx, boundary, provider) else {
                continue;
            };
            let existing = ctx
                .connections()
                .get(boundary)
                .await?
                .filter(InterCloudConnection::is_resolvable);

            match existing {
                Some(connection) if self.glue_exists(ctx, provider, primary).await? => {
                    debug!(boundary = boundary.key(), "Reusing inter-cloud connection");
                    tokens.insert(boundary, connection.token);
                }
                _ => {
                    tokens.insert(boundary, generate_token());
                    minted.push((boundary, primary));
                }
            }
        }

        self.plan_with_tokens(ctx, provider, &tokens)?
            .apply(ctx)
            .await?;

        for (boundary, primary) in minted {
            let endpoint = self.glue_endpoint(ctx, provider, primary).await?;
            match (endpoint.filter(|e| !e.is_empty()), tokens.remove(&boundary)) {
                (Some(url), Some(token)) => {
                    ctx.connections()
                        .put(boundary, InterCloudConnection::new(url, token))
                        .await?;
                    info!(
                        boundary = boundary.key(),
                        glue = primary.name,
                        "Inter-cloud connection recorded"
                    );
                }
                _ => warn!(boundary = boundary.key(), glue = primary.name, "Glue has no endpoint"),
            }
        }
        Ok(())
    }

    #[instrument(skip_all, fields(provider = %provider))]
    async fn destroy(&self, ctx: &DeploymentContext, provider: Provider) -> Result<()> {
        let teardown = self.plan(ctx, provider).await?.teardown(ctx).await;

        let mut failures = Vec::new();
        for boundary in ctx.resolver().hosted_by(provider) {
            let Some(primary) = primary_glue(ctx, boundary, provider) else {
                continue;
            };
            if let Err(e) = self.release_connection(ctx, provider, boundary, primary).await {
                warn!(boundary = boundary.key(), error = %e, "Connection release failed, continuing");
                failures.push(format!("inter-cloud connection {}: {e}", boundary.key()));
            }
        }

        match teardown {
            Err(DeployError::Destroy {
                layer,
                provider,
                failures: mut teardown_failures,
            }) => {
                teardown_failures.extend(failures);
                Err(DeployError::Destroy {
                    layer,
                    provider,
                    failures: teardown_failures,
                })
            }
            Err(e) => Err(e),
            Ok(()) if failures.is_empty() => Ok(()),
            Ok(()) => Err(DeployError::Destroy {
                layer: MacroLayer::L0,
                provider,
                failures,
            }),
        }
    }
}

/// The glue unit whose endpoint a boundary's connection points at
fn primary_glue(
    ctx: &DeploymentContext,
    boundary: Boundary,
    provider: Provider,
) -> Option<&FunctionDefinition> {
    ctx.catalog()
        .get_by_boundary(boundary)
        .into_iter()
        .find(|d| d.supports(provider))
}

/// Local resource the boundary's glue hands data to
fn local_target(ctx: &DeploymentContext, provider: Provider, boundary: Boundary) -> Result<String> {
    match boundary {
        Boundary::L1ToL2 => unit_name(ctx, provider, PERSISTER, None),
        Boundary::L2ToL3Hot => StorageTier::Hot.container_name(ctx, provider),
        Boundary::L3HotToL3Cold => StorageTier::Cold.container_name(ctx, provider),
        Boundary::L3ColdToL3Archive => StorageTier::Archive.container_name(ctx, provider),
        Boundary::L3HotToL4 => ctx.name(provider, TWIN_GRAPH, None, ResourceKind::TwinGraph),
        Boundary::L3HotToL5 => ctx.name(provider, DASHBOARD, None, ResourceKind::Dashboard),
    }
}
