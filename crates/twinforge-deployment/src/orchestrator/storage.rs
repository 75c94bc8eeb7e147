//! L3: tiered storage
//!
//! Hot, cold and archive tiers are separate macro-layers that may each live
//! on a different provider. Every tier owns one storage container; hot and
//! cold additionally run the readers and the movers that age data down to
//! the next tier.

use super::plan::base_environment;
use super::twin::TWIN_GRAPH;
use super::visualization::DASHBOARD;
use super::{
    layer_units, link_environment, new_plan, role_step, storage_step, unit_step,
    LayerOrchestrator, LayerPlan,
};
use crate::context::DeploymentContext;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use twinforge_naming::ResourceKind;
use twinforge_types::{Boundary, LayerSlot, MacroLayer, Provider};

/// One storage tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageTier {
    Hot,
    Cold,
    Archive,
}

impl StorageTier {
    pub fn layer(&self) -> MacroLayer {
        match self {
            StorageTier::Hot => MacroLayer::L3Hot,
            StorageTier::Cold => MacroLayer::L3Cold,
            StorageTier::Archive => MacroLayer::L3Archive,
        }
    }

    /// Component name of the tier's container
    pub fn container(&self) -> &'static str {
        match self {
            StorageTier::Hot => "hot-storage",
            StorageTier::Cold => "cold-storage",
            StorageTier::Archive => "archive-storage",
        }
    }

    /// Role the tier's units run as; the archive tier runs none
    pub fn role(&self) -> Option<&'static str> {
        match self {
            StorageTier::Hot => Some("storage-role"),
            StorageTier::Cold => Some("cold-storage-role"),
            StorageTier::Archive => None,
        }
    }

    /// The tier below this one and the boundary data crosses to reach it
    fn next(&self) -> Option<(StorageTier, Boundary)> {
        match self {
            StorageTier::Hot => Some((StorageTier::Cold, Boundary::L3HotToL3Cold)),
            StorageTier::Cold => Some((StorageTier::Archive, Boundary::L3ColdToL3Archive)),
            StorageTier::Archive => None,
        }
    }

    fn slot(&self) -> LayerSlot {
        match self {
            StorageTier::Hot => LayerSlot::L3Hot,
            StorageTier::Cold => LayerSlot::L3Cold,
            StorageTier::Archive => LayerSlot::L3Archive,
        }
    }

    /// Retention before data moves down a tier
    fn retention_days(&self, ctx: &DeploymentContext) -> Option<u32> {
        let retention = ctx.config().retention;
        match self {
            StorageTier::Hot => Some(retention.hot_days),
            StorageTier::Cold => Some(retention.cold_days),
            StorageTier::Archive => None,
        }
    }

    /// Deployed container name on `provider`
    pub fn container_name(&self, ctx: &DeploymentContext, provider: Provider) -> Result<String> {
        ctx.name(provider, self.container(), None, ResourceKind::StorageContainer)
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            StorageTier::Hot => "HOT_STORAGE",
            StorageTier::Cold => "COLD_STORAGE",
            StorageTier::Archive => "ARCHIVE_STORAGE",
        }
    }

    fn days_key(&self) -> &'static str {
        match self {
            StorageTier::Hot => "HOT_DAYS",
            StorageTier::Cold => "COLD_DAYS",
            StorageTier::Archive => "ARCHIVE_DAYS",
        }
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.container())
    }
}

/// Orchestrator for one storage tier
#[derive(Debug, Clone, Copy)]
pub struct StorageOrchestrator {
    tier: StorageTier,
}

impl StorageOrchestrator {
    pub fn new(tier: StorageTier) -> Self {
        Self { tier }
    }

    pub fn tier(&self) -> StorageTier {
        self.tier
    }
}

#[async_trait]
impl LayerOrchestrator for StorageOrchestrator {
    fn layer(&self) -> MacroLayer {
        self.tier.layer()
    }

    async fn plan(&self, ctx: &DeploymentContext, provider: Provider) -> Result<LayerPlan> {
        let tier = self.tier;
        let mut plan = new_plan(ctx, tier.layer(), provider)?;

        let container = storage_step(ctx, provider, tier.container())?;
        let container_name = container.name().to_string();
        plan.push(container);

        let Some(role) = tier.role() else {
            return Ok(plan);
        };
        let units = layer_units(ctx, provider, tier.layer())?;
        if units.is_empty() {
            return Ok(plan);
        }
        let role = role_step(ctx, provider, role)?;
        plan.push(role.clone());

        for unit in &units {
            let mut env = base_environment(ctx, provider);
            env.insert(format!("{}_TARGET", tier.env_prefix()), container_name.clone());
            if let Some(days) = tier.retention_days(ctx) {
                env.insert(tier.days_key().into(), days.to_string());
            }
            // Movers push aged data to the next tier
            if unit.name().ends_with("-mover") {
                if let Some((next, boundary)) = tier.next() {
                    let next_provider = ctx.provider(next.slot());
                    link_environment(ctx, &mut env, boundary, next.env_prefix(), || {
                        next.container_name(ctx, next_provider)
                    })
                    .await?;
                }
            }
            // Hot readers feed the twin graph and the dashboard
            if tier == StorageTier::Hot && unit.name().starts_with("hot-reader") {
                link_readers(ctx, &mut env).await?;
            }
            plan.push(unit_step(ctx, provider, unit, &role, env, false)?);
        }

        Ok(plan)
    }
}

/// `TWIN_GRAPH_*` and `DASHBOARD_*` for a hot reader: the local resource
/// names, or the connector endpoints when L4 or L5 is on another cloud
async fn link_readers(
    ctx: &DeploymentContext,
    env: &mut std::collections::BTreeMap<String, String>,
) -> Result<()> {
    let twin_provider = ctx.provider(LayerSlot::L4);
    link_environment(ctx, env, Boundary::L3HotToL4, "TWIN_GRAPH", || {
        ctx.name(twin_provider, TWIN_GRAPH, None, ResourceKind::TwinGraph)
    })
    .await?;

    let dashboard_provider = ctx.provider(LayerSlot::L5);
    link_environment(ctx, env, Boundary::L3HotToL5, "DASHBOARD", || {
        ctx.name(dashboard_provider, DASHBOARD, None, ResourceKind::Dashboard)
    })
    .await
}
