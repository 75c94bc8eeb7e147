//! L2: data processing
//!
//! The persister, one processor per device and the feature-gated event
//! units. Persisted records go to hot storage, locally or through the
//! hot-writer glue when hot storage lives on another cloud.

use super::plan::base_environment;
use super::storage::StorageTier;
use super::{
    layer_units, link_environment, new_plan, resource_step, role_step, unit_step,
    LayerOrchestrator, LayerPlan,
};
use crate::context::DeploymentContext;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::json;
use twinforge_naming::ResourceKind;
use twinforge_types::{Boundary, FeatureFlag, LayerSlot, MacroLayer, Provider};

pub const PERSISTER: &str = "persister";
pub const PROCESSING_ROLE: &str = "processing-role";
pub const FEEDBACK_QUEUE: &str = "feedback-queue";

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessingOrchestrator;

#[async_trait]
impl LayerOrchestrator for ProcessingOrchestrator {
    fn layer(&self) -> MacroLayer {
        MacroLayer::L2
    }

    async fn plan(&self, ctx: &DeploymentContext, provider: Provider) -> Result<LayerPlan> {
        let mut plan = new_plan(ctx, MacroLayer::L2, provider)?;
        let role = role_step(ctx, provider, PROCESSING_ROLE)?;
        plan.push(role.clone());

        let feedback = match ctx.config().is_enabled(FeatureFlag::ReturnFeedbackToDevice) {
            true => {
                let queue = resource_step(
                    ctx,
                    provider,
                    FEEDBACK_QUEUE,
                    ResourceKind::Queue,
                    json!({ "fifo": true }),
                )?;
                let name = queue.name().to_string();
                plan.push(queue);
                Some(name)
            }
            false => None,
        };

        let hot = ctx.provider(LayerSlot::L3Hot);
        for unit in layer_units(ctx, provider, MacroLayer::L2)? {
            let mut env = base_environment(ctx, provider);
            if let Some(device) = &unit.device {
                env.insert("DEVICE_ID".into(), device.to_string());
            }
            if let Some(queue) = &feedback {
                env.insert("FEEDBACK_QUEUE".into(), queue.clone());
            }
            if unit.name() == PERSISTER {
                link_environment(ctx, &mut env, Boundary::L2ToL3Hot, "HOT_STORAGE", || {
                    StorageTier::Hot.container_name(ctx, hot)
                })
                .await?;
            }
            plan.push(unit_step(ctx, provider, &unit, &role, env, false)?);
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;
    use crate::orchestrator::unit_name;
    use crate::testing::{config, Harness};

    #[tokio::test]
    async fn test_units_per_device_and_feature() {
        let harness = Harness::new(
            config(Provider::Aws)
                .with_feature(FeatureFlag::UseEventChecking, true)
                .with_feature(FeatureFlag::ReturnFeedbackToDevice, true),
        );
        let plan = ProcessingOrchestrator.plan(&harness.ctx, Provider::Aws).await.unwrap();
        let components: Vec<_> = plan.steps.iter().map(|s| s.component().to_string()).collect();
        assert_eq!(
            components,
            vec![
                PROCESSING_ROLE,
                FEEDBACK_QUEUE,
                "persister",
                "processor-s1",
                "processor-s2",
                "event-checker",
                "event-feedback",
            ]
        );
    }

    #[tokio::test]
    async fn test_preflight_lists_every_missing_component() {
        let harness = Harness::single(Provider::Azure);
        let err = ProcessingOrchestrator
            .deploy(&harness.ctx, Provider::Azure)
            .await
            .unwrap_err();
        let DeployError::Preflight { missing, .. } = &err else {
            panic!("expected pre-flight failure, got {err}");
        };
        assert!(missing.contains(&"Resource Group".to_string()));
        assert!(missing.contains(&"Dispatcher".to_string()));
        assert!(missing.contains(&"Iot Thing S2".to_string()));
        assert!(err.to_string().contains("Dispatcher"));
    }

    fn uploads(harness: &Harness, provider: Provider) -> Vec<String> {
        harness
            .plane(provider)
            .journal()
            .into_iter()
            .filter_map(|e| match e {
                crate::memory::JournalEntry::Uploaded { unit, .. } => Some(unit),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_multiplexed_app_uploads_once() {
        let harness = Harness::single(Provider::Azure);
        harness.deploy_before(MacroLayer::L2).await;
        ProcessingOrchestrator.deploy(&harness.ctx, Provider::Azure).await.unwrap();

        let info = ProcessingOrchestrator.info(&harness.ctx, Provider::Azure).await.unwrap();
        assert!(info.is_complete());

        // One app per application: L1 then L2, hosted by their first unit
        let persister = unit_name(&harness.ctx, Provider::Azure, PERSISTER, None).unwrap();
        let uploaded = uploads(&harness, Provider::Azure);
        assert_eq!(uploaded.len(), 2);
        assert_eq!(uploaded[1], persister);
    }

    #[tokio::test]
    async fn test_per_unit_uploads_each_unit() {
        let harness = Harness::single(Provider::Aws);
        harness.deploy_before(MacroLayer::L2).await;
        ProcessingOrchestrator.deploy(&harness.ctx, Provider::Aws).await.unwrap();

        // L1 dispatcher + persister + two processors
        assert_eq!(uploads(&harness, Provider::Aws).len(), 4);
    }
}
