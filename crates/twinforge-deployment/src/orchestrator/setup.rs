//! Setup: the resource group and platform role every later layer on the
//! provider lives under

use super::{new_plan, resource_step, role_step, LayerOrchestrator, LayerPlan};
use crate::context::DeploymentContext;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::json;
use twinforge_naming::ResourceKind;
use twinforge_types::{MacroLayer, Provider};

/// Component name of the provider's resource group
pub const RESOURCE_GROUP: &str = "resource-group";
pub const PLATFORM_ROLE: &str = "platform-role";

#[derive(Debug, Clone, Copy, Default)]
pub struct SetupOrchestrator;

#[async_trait]
impl LayerOrchestrator for SetupOrchestrator {
    fn layer(&self) -> MacroLayer {
        MacroLayer::Setup
    }

    async fn plan(&self, ctx: &DeploymentContext, provider: Provider) -> Result<LayerPlan> {
        let mut plan = new_plan(ctx, MacroLayer::Setup, provider)?;
        plan.push(resource_step(
            ctx,
            provider,
            RESOURCE_GROUP,
            ResourceKind::ResourceGroup,
            json!({ "twin": ctx.config().twin_name.as_str() }),
        )?);
        plan.push(role_step(ctx, provider, PLATFORM_ROLE)?);
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::JournalEntry;
    use crate::testing::Harness;

    #[tokio::test]
    async fn test_setup_creates_group_then_role() {
        let harness = Harness::single(Provider::Aws);
        SetupOrchestrator
            .deploy(&harness.ctx, Provider::Aws)
            .await
            .unwrap();

        let info = SetupOrchestrator.info(&harness.ctx, Provider::Aws).await.unwrap();
        assert!(info.is_complete());
        assert_eq!(info.components.len(), 2);

        let journal = harness.plane(Provider::Aws).journal();
        assert!(matches!(
            &journal[0],
            JournalEntry::Created { kind: ResourceKind::ResourceGroup, .. }
        ));
        assert!(matches!(&journal[1], JournalEntry::Created { kind: ResourceKind::Role, .. }));
        assert!(matches!(&journal[2], JournalEntry::Assigned { .. }));
    }

    #[tokio::test]
    async fn test_setup_is_idempotent() {
        let harness = Harness::single(Provider::Azure);
        SetupOrchestrator.deploy(&harness.ctx, Provider::Azure).await.unwrap();
        SetupOrchestrator.deploy(&harness.ctx, Provider::Azure).await.unwrap();
        assert_eq!(harness.plane(Provider::Azure).resource_count(), 2);

        SetupOrchestrator.destroy(&harness.ctx, Provider::Azure).await.unwrap();
        assert_eq!(harness.plane(Provider::Azure).resource_count(), 0);
        let info = SetupOrchestrator.info(&harness.ctx, Provider::Azure).await.unwrap();
        assert!(info.is_absent());
    }
}
