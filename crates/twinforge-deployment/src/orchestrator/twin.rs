//! L4: twin management

use super::plan::base_environment;
use super::{
    device_steps, layer_units, new_plan, resource_step, role_step, unit_name, unit_step,
    LayerOrchestrator, LayerPlan,
};
use crate::context::DeploymentContext;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::json;
use twinforge_naming::ResourceKind;
use twinforge_types::{Boundary, LayerSlot, MacroLayer, Provider};

pub const TWIN_ROLE: &str = "twin-role";
pub const TWIN_GRAPH: &str = "twin-graph";
pub const TWIN_ENTITY: &str = "twin-entity";

/// Local unit the twin updater reads hot data through when hot storage
/// lives on another cloud
const TWIN_CONNECTOR: &str = "digital-twin-data-connector";
const HOT_READER: &str = "hot-reader";

#[derive(Debug, Clone, Copy, Default)]
pub struct TwinOrchestrator;

#[async_trait]
impl LayerOrchestrator for TwinOrchestrator {
    fn layer(&self) -> MacroLayer {
        MacroLayer::L4
    }

    async fn plan(&self, ctx: &DeploymentContext, provider: Provider) -> Result<LayerPlan> {
        let mut plan = new_plan(ctx, MacroLayer::L4, provider)?;
        let role = role_step(ctx, provider, TWIN_ROLE)?;
        plan.push(role.clone());

        let graph = resource_step(
            ctx,
            provider,
            TWIN_GRAPH,
            ResourceKind::TwinGraph,
            json!({ "twin": ctx.config().twin_name.as_str() }),
        )?;
        let graph_name = graph.name().to_string();
        plan.push(graph);

        let hot_reader = if ctx.resolver().is_crossed(Boundary::L3HotToL4) {
            unit_name(ctx, provider, TWIN_CONNECTOR, None)?
        } else {
            unit_name(ctx, ctx.provider(LayerSlot::L3Hot), HOT_READER, None)?
        };

        for unit in layer_units(ctx, provider, MacroLayer::L4)? {
            let mut env = base_environment(ctx, provider);
            env.insert("TWIN_GRAPH".into(), graph_name.clone());
            env.insert("HOT_READER".into(), hot_reader.clone());
            plan.push(unit_step(ctx, provider, &unit, &role, env, false)?);
        }

        plan.extend(device_steps(ctx, provider, TWIN_ENTITY, ResourceKind::TwinEntity, |device| {
            json!({ "graph": graph_name, "device": device.as_str() })
        })?);

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Step;
    use crate::testing::{config, Harness};

    #[tokio::test]
    async fn test_updater_reads_through_connector_when_crossed() {
        let harness =
            Harness::new(config(Provider::Aws).with_provider(LayerSlot::L4, Provider::Azure));
        let plan = TwinOrchestrator.plan(&harness.ctx, Provider::Azure).await.unwrap();

        let Some(Step::Unit { spec, .. }) = plan.step("twin-updater") else {
            panic!("updater missing from plan");
        };
        let connector = unit_name(&harness.ctx, Provider::Azure, TWIN_CONNECTOR, None).unwrap();
        assert_eq!(spec.environment.get("HOT_READER"), Some(&connector));
    }

    #[tokio::test]
    async fn test_twin_deploys_after_hot_storage() {
        let harness = Harness::single(Provider::Azure);
        harness.deploy_before(MacroLayer::L4).await;
        TwinOrchestrator.deploy(&harness.ctx, Provider::Azure).await.unwrap();

        let info = TwinOrchestrator.info(&harness.ctx, Provider::Azure).await.unwrap();
        assert!(info.is_complete());
        assert_eq!(info.is_present("twin-entity-s1"), Some(true));
        assert_eq!(info.is_present("twin-updater"), Some(true));
    }
}
