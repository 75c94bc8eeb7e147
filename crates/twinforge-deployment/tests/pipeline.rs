//! End-to-end deploy / destroy of a multi-cloud twin on in-memory control planes

use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;
use twinforge_catalog::FunctionCatalog;
use twinforge_deployment::adapter::CloudError;
use twinforge_deployment::orchestrator::{orchestrator_for, LayerOrchestrator};
use twinforge_deployment::{
    DeployError, DeployerSettings, DeploymentContext, DeploymentPipeline, InMemoryControlPlane,
    JournalEntry,
};
use twinforge_naming::ResourceKind;
use twinforge_package::scaffold_sources;
use twinforge_types::{
    Boundary, DeviceConfig, DeviceId, FeatureFlag, LayerSlot, MacroLayer, ProjectConfig,
    Provider, TwinName,
};

struct Project {
    _dir: TempDir,
    ctx: DeploymentContext,
    planes: BTreeMap<Provider, Arc<InMemoryControlPlane>>,
}

impl Project {
    fn new(config: ProjectConfig, propagation_failures: u32) -> Self {
        let dir = TempDir::new().unwrap();
        scaffold_sources(dir.path(), &FunctionCatalog::standard(), &config).unwrap();

        let planes: BTreeMap<_, _> = config
            .providers_in_use()
            .into_iter()
            .map(|p| {
                let plane =
                    InMemoryControlPlane::new(p).with_propagation_failures(propagation_failures);
                (p, Arc::new(plane))
            })
            .collect();

        let mut builder = DeploymentContext::builder(dir.path(), config)
            .with_settings(DeployerSettings::immediate());
        for plane in planes.values() {
            builder = builder.with_adapter(plane.clone());
        }

        Self {
            ctx: builder.build().unwrap(),
            _dir: dir,
            planes,
        }
    }

    fn plane(&self, provider: Provider) -> &InMemoryControlPlane {
        &self.planes[&provider]
    }

    fn resources(&self) -> usize {
        self.planes.values().map(|p| p.resource_count()).sum()
    }
}

/// L1=aws, L2=azure, L3 hot=azure, L4=azure, L5=aws
fn mixed() -> ProjectConfig {
    ProjectConfig::single_provider(TwinName::new("factory").unwrap(), Provider::Azure)
        .with_provider(LayerSlot::L1, Provider::Aws)
        .with_provider(LayerSlot::L5, Provider::Aws)
        .with_device(DeviceConfig::new(DeviceId::new("press-1").unwrap()))
        .with_device(DeviceConfig::new(DeviceId::new("press-2").unwrap()))
        .with_feature(FeatureFlag::UseEventChecking, true)
        .with_feature(FeatureFlag::ReturnFeedbackToDevice, true)
}

fn created(journal: &[JournalEntry]) -> Vec<(ResourceKind, String)> {
    journal
        .iter()
        .filter_map(|e| match e {
            JournalEntry::Created { kind, name } => Some((*kind, name.clone())),
            _ => None,
        })
        .collect()
}

fn deleted(journal: &[JournalEntry]) -> Vec<(ResourceKind, String)> {
    journal
        .iter()
        .filter_map(|e| match e {
            JournalEntry::Deleted { kind, name } => Some((*kind, name.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_mixed_glue_placement() {
    let project = Project::new(mixed(), 0);
    let catalog = project.ctx.catalog();
    let config = project.ctx.config();

    let azure = catalog.get_l0_for_config(config, Provider::Azure).unwrap();
    assert!(azure.contains(&"ingestion"));
    assert!(!azure.contains(&"hot-writer"));

    let aws = catalog.get_l0_for_config(config, Provider::Aws).unwrap();
    assert!(aws.contains(&"dashboard-data-connector"));
    assert!(!aws.contains(&"ingestion"));
}

#[tokio::test]
async fn test_deploy_and_destroy_leave_nothing_behind() {
    let project = Project::new(mixed(), 0);
    let pipeline = DeploymentPipeline::new(&project.ctx);

    pipeline.deploy_all().await.unwrap();
    let infos = pipeline.info_all().await.unwrap();
    assert!(infos.iter().all(|i| i.is_complete()), "{infos:?}");

    let connections = project.ctx.connections().list().await.unwrap();
    assert!(connections.contains_key(Boundary::L1ToL2.key()));
    assert!(connections.contains_key(Boundary::L3HotToL5.key()));
    assert_eq!(connections.len(), 2);

    pipeline.destroy_all().await.unwrap();
    assert_eq!(project.resources(), 0);
    assert!(project.ctx.connections().list().await.unwrap().is_empty());

    // Within each provider, deletes mirror creates
    for provider in [Provider::Aws, Provider::Azure] {
        let journal = project.plane(provider).journal();
        let mut creates = created(&journal);
        creates.reverse();
        assert_eq!(deleted(&journal), creates, "{provider}");
    }
}

#[tokio::test]
async fn test_units_wait_out_role_propagation() {
    let project = Project::new(mixed(), 2);
    DeploymentPipeline::new(&project.ctx).deploy_all().await.unwrap();

    let infos = DeploymentPipeline::new(&project.ctx).info_all().await.unwrap();
    assert!(infos.iter().all(|i| i.is_complete()));
}

#[tokio::test]
async fn test_missing_persister_blocks_hot_storage() {
    let project = Project::new(mixed(), 0);
    for layer in [MacroLayer::Setup, MacroLayer::L0, MacroLayer::L1, MacroLayer::L2] {
        for provider in project.ctx.targets(layer) {
            orchestrator_for(layer).deploy(&project.ctx, provider).await.unwrap();
        }
    }

    let persister = project
        .ctx
        .name(Provider::Azure, "persister", None, ResourceKind::Function)
        .unwrap();
    assert!(project
        .plane(Provider::Azure)
        .remove_silently(ResourceKind::Function, &persister));

    let err = orchestrator_for(MacroLayer::L3Hot)
        .deploy(&project.ctx, Provider::Azure)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Preflight { .. }));
    assert!(err.to_string().contains("Persister"), "{err}");
}

#[tokio::test]
async fn test_destroy_continues_past_failures() {
    let project = Project::new(mixed(), 0);
    let pipeline = DeploymentPipeline::new(&project.ctx);
    pipeline.deploy_all().await.unwrap();

    let dashboard = project
        .ctx
        .name(Provider::Aws, "dashboard", None, ResourceKind::Dashboard)
        .unwrap();
    let graph = project
        .ctx
        .name(Provider::Azure, "twin-graph", None, ResourceKind::TwinGraph)
        .unwrap();
    let denied = |p| CloudError::new(p, "AccessDenied", "locked").with_status(403);
    project
        .plane(Provider::Aws)
        .fail_deletes_of(ResourceKind::Dashboard, &dashboard, denied(Provider::Aws));
    project
        .plane(Provider::Azure)
        .fail_deletes_of(ResourceKind::TwinGraph, &graph, denied(Provider::Azure));

    let err = pipeline.destroy_all().await.unwrap_err();
    let DeployError::Incomplete(failures) = &err else {
        panic!("expected aggregated failures, got {err}");
    };
    assert_eq!(failures.len(), 2);
    assert!(failures
        .iter()
        .all(|f| matches!(f, DeployError::Destroy { failures, .. } if failures.len() == 1)));

    // Everything else is gone
    assert_eq!(project.resources(), 2);
}

#[tokio::test]
async fn test_redeploy_keeps_connections() {
    let project = Project::new(mixed(), 0);
    let pipeline = DeploymentPipeline::new(&project.ctx);

    pipeline.deploy_all().await.unwrap();
    let before = project.ctx.connections().list().await.unwrap();

    pipeline.deploy_all().await.unwrap();
    let after = project.ctx.connections().list().await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_missing_adapter_is_a_configuration_problem() {
    let err = DeploymentContext::builder(".", mixed())
        .with_adapter(Arc::new(InMemoryControlPlane::new(Provider::Aws)))
        .build()
        .unwrap_err();
    assert!(matches!(err, DeployError::MissingAdapter(Provider::Azure)));
}

#[tokio::test]
async fn test_failed_preflight_creates_nothing() {
    let project = Project::new(mixed(), 0);
    let before = project.resources();
    let result = orchestrator_for(MacroLayer::L5)
        .deploy(&project.ctx, Provider::Aws)
        .await;
    assert!(result.is_err());
    assert_eq!(project.resources(), before);
}
