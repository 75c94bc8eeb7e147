//! L5: visualization

use super::{new_plan, resource_step, unit_name, LayerOrchestrator, LayerPlan};
use crate::context::DeploymentContext;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::json;
use twinforge_naming::ResourceKind;
use twinforge_types::{Boundary, LayerSlot, MacroLayer, Provider};

pub const DASHBOARD: &str = "dashboard";
pub const DATA_SOURCE: &str = "data-source";

/// Local unit the dashboard queries when hot storage is on another cloud
const DASHBOARD_CONNECTOR: &str = "dashboard-data-connector";

#[derive(Debug, Clone, Copy, Default)]
pub struct VisualizationOrchestrator;

#[async_trait]
impl LayerOrchestrator for VisualizationOrchestrator {
    fn layer(&self) -> MacroLayer {
        MacroLayer::L5
    }

    async fn plan(&self, ctx: &DeploymentContext, provider: Provider) -> Result<LayerPlan> {
        let mut plan = new_plan(ctx, MacroLayer::L5, provider)?;

        let dashboard = resource_step(
            ctx,
            provider,
            DASHBOARD,
            ResourceKind::Dashboard,
            json!({ "twin": ctx.config().twin_name.as_str() }),
        )?;
        let dashboard_name = dashboard.name().to_string();
        plan.push(dashboard);

        let reader = if ctx.resolver().is_crossed(Boundary::L3HotToL5) {
            unit_name(ctx, provider, DASHBOARD_CONNECTOR, None)?
        } else {
            unit_name(ctx, ctx.provider(LayerSlot::L3Hot), "hot-reader", None)?
        };
        plan.push(resource_step(
            ctx,
            provider,
            DATA_SOURCE,
            ResourceKind::DataSource,
            json!({ "dashboard": dashboard_name, "hot_reader": reader }),
        )?);

        Ok(plan)
    }
}
