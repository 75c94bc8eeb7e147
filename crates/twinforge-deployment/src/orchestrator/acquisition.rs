//! L1: data acquisition
//!
//! An IoT registry with one thing per configured device, and the dispatcher
//! that forwards device telemetry to processing.

use super::plan::base_environment;
use super::processing::PERSISTER;
use super::{
    device_steps, layer_units, link_environment, new_plan, resource_step, role_step, unit_name,
    unit_step, LayerOrchestrator, LayerPlan,
};
use crate::context::DeploymentContext;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::json;
use twinforge_naming::ResourceKind;
use twinforge_types::{Boundary, LayerSlot, MacroLayer, Provider};

pub const IOT_REGISTRY: &str = "iot-registry";
pub const IOT_THING: &str = "iot-thing";
pub const DISPATCHER_ROLE: &str = "dispatcher-role";

#[derive(Debug, Clone, Copy, Default)]
pub struct AcquisitionOrchestrator;

#[async_trait]
impl LayerOrchestrator for AcquisitionOrchestrator {
    fn layer(&self) -> MacroLayer {
        MacroLayer::L1
    }

    async fn plan(&self, ctx: &DeploymentContext, provider: Provider) -> Result<LayerPlan> {
        let mut plan = new_plan(ctx, MacroLayer::L1, provider)?;

        let registry = resource_step(
            ctx,
            provider,
            IOT_REGISTRY,
            ResourceKind::IotRegistry,
            json!({ "twin": ctx.config().twin_name.as_str() }),
        )?;
        let registry_name = registry.name().to_string();
        plan.push(registry);

        let units = layer_units(ctx, provider, MacroLayer::L1)?;
        if !units.is_empty() {
            let role = role_step(ctx, provider, DISPATCHER_ROLE)?;
            plan.push(role.clone());

            let processing = ctx.provider(LayerSlot::L2);
            for unit in &units {
                let mut env = base_environment(ctx, provider);
                env.insert("IOT_REGISTRY".into(), registry_name.clone());
                link_environment(ctx, &mut env, Boundary::L1ToL2, "INGESTION", || {
                    unit_name(ctx, processing, PERSISTER, None)
                })
                .await?;
                plan.push(unit_step(ctx, provider, unit, &role, env, false)?);
            }
        }

        plan.extend(device_steps(ctx, provider, IOT_THING, ResourceKind::IotThing, |device| {
            let properties = ctx
                .config()
                .devices
                .iter()
                .find(|d| &d.id == device)
                .map(|d| d.properties.clone())
                .unwrap_or_default();
            json!({
                "registry": registry_name,
                "device": device.as_str(),
                "properties": properties,
            })
        })?);

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;
    use crate::testing::{config, Harness};

    #[tokio::test]
    async fn test_things_per_device() {
        let harness = Harness::single(Provider::Aws);
        harness.deploy_before(MacroLayer::L1).await;
        AcquisitionOrchestrator.deploy(&harness.ctx, Provider::Aws).await.unwrap();

        let info = AcquisitionOrchestrator.info(&harness.ctx, Provider::Aws).await.unwrap();
        let components: Vec<_> = info.components.iter().map(|c| c.component.as_str()).collect();
        assert_eq!(
            components,
            vec![
                IOT_REGISTRY,
                DISPATCHER_ROLE,
                "dispatcher",
                "iot-thing-s1",
                "iot-thing-s2"
            ]
        );
        assert!(info.is_complete());
    }

    #[tokio::test]
    async fn test_dispatcher_targets_local_persister() {
        let harness = Harness::single(Provider::Aws);
        let plan = AcquisitionOrchestrator.plan(&harness.ctx, Provider::Aws).await.unwrap();
        let Some(crate::orchestrator::Step::Unit { spec, .. }) = plan.step("dispatcher") else {
            panic!("dispatcher missing from plan");
        };
        let persister = unit_name(&harness.ctx, Provider::Aws, PERSISTER, None).unwrap();
        assert_eq!(spec.environment.get("INGESTION_TARGET"), Some(&persister));
        assert!(!spec.environment.contains_key("INGESTION_URL"));
    }

    #[tokio::test]
    async fn test_crossed_dispatcher_needs_connection() {
        let harness =
            Harness::new(config(Provider::Aws).with_provider(LayerSlot::L2, Provider::Azure));
        // The azure ingestion glue was never deployed
        harness.deploy_before(MacroLayer::L0).await;
        crate::orchestrator::GlueOrchestrator
            .deploy(&harness.ctx, Provider::Aws)
            .await
            .unwrap();

        let err = AcquisitionOrchestrator
            .deploy(&harness.ctx, Provider::Aws)
            .await
            .unwrap_err();
        let DeployError::Preflight { missing, .. } = &err else {
            panic!("expected pre-flight failure, got {err}");
        };
        assert_eq!(missing, &vec!["Inter-cloud connection l1_to_l2".to_string()]);
    }
}
