//! Dry-run deployment commands: deploy, destroy, info

use super::load_config;
use crate::output::{print_info, print_json, print_success, OutputFormat};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use twinforge_deployment::{
    DeployerSettings, DeploymentContext, DeploymentPipeline, FileConnectionStore,
    InMemoryControlPlane, LayerInfo, PipelineEvent,
};

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Apply the project's propagation and warm-up waits instead of skipping them
    #[arg(long)]
    real_waits: bool,

    /// Write inter-cloud connection records through to config_inter_cloud.json
    #[arg(long)]
    record_connections: bool,
}

impl DeployArgs {
    fn rehearsal() -> Self {
        Self {
            real_waits: false,
            record_connections: false,
        }
    }
}

/// Dry-run context, optionally with the project's own timing settings and
/// its on-disk connection records
fn dry_run_context(project: &Path, args: &DeployArgs) -> anyhow::Result<DeploymentContext> {
    let config = load_config(project)?;
    let settings = match args.real_waits {
        true => DeployerSettings::load(project)?,
        false => DeployerSettings::immediate(),
    };

    let mut builder = DeploymentContext::builder(project, config.clone()).with_settings(settings);
    if args.record_connections {
        builder = builder.with_connection_store(Arc::new(FileConnectionStore::in_project(project)));
    }
    for provider in config.providers_in_use() {
        builder = builder.with_adapter(Arc::new(InMemoryControlPlane::new(provider)));
    }
    Ok(builder.build()?)
}

fn print_infos(infos: &[LayerInfo], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(infos),
        OutputFormat::Text => {
            for info in infos {
                print!("{info}");
            }
            Ok(())
        }
    }
}

pub async fn deploy(project: &Path, args: DeployArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = dry_run_context(project, &args)?;
    let pipeline = DeploymentPipeline::new(&ctx);

    pipeline.deploy_all().await?;
    print_infos(&pipeline.info_all().await?, format)?;
    if let OutputFormat::Text = format {
        print_success(&format!("Deployed {} (dry run)", ctx.config().twin_name));
    }
    Ok(())
}

pub async fn destroy(project: &Path, args: DeployArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = dry_run_context(project, &args)?;
    let pipeline = DeploymentPipeline::new(&ctx);

    pipeline.deploy_all().await?;
    let mut events = pipeline.subscribe();
    pipeline.destroy_all().await?;

    let mut destroyed = Vec::new();
    while let Ok(event) = events.try_recv() {
        destroyed.push(event);
    }

    match format {
        OutputFormat::Json => print_json(&destroyed)?,
        OutputFormat::Text => {
            for event in &destroyed {
                if let PipelineEvent::LayerDestroyed { layer, provider } = event {
                    print_info(&format!("{layer} on {}", provider.display_name()));
                }
            }
            print_success(&format!("Destroyed {} (dry run)", ctx.config().twin_name));
        }
    }
    Ok(())
}

pub async fn info(project: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = dry_run_context(project, &DeployArgs::rehearsal())?;
    print_infos(&DeploymentPipeline::new(&ctx).info_all().await?, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use twinforge_types::config::{
        CONFIG_FILE, DEVICES_FILE, INTER_CLOUD_FILE, PROVIDERS_FILE,
    };

    fn write_project(dir: &Path) {
        std::fs::write(dir.join(CONFIG_FILE), r#"{"digital_twin_name": "plant"}"#).unwrap();
        std::fs::write(
            dir.join(PROVIDERS_FILE),
            r#"{
                "layer_1_provider": "aws",
                "layer_2_provider": "aws",
                "layer_3_hot_provider": "aws",
                "layer_3_cold_provider": "aws",
                "layer_3_archive_provider": "aws",
                "layer_4_provider": "azure",
                "layer_5_provider": "azure"
            }"#,
        )
        .unwrap();
        std::fs::write(dir.join(DEVICES_FILE), r#"[{"id": "s1"}]"#).unwrap();
        crate::commands::project::init(dir, OutputFormat::Json).unwrap();
    }

    fn recorded(dir: &Path) -> serde_json::Value {
        let raw = std::fs::read_to_string(dir.join(INTER_CLOUD_FILE)).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_recorded_connections_land_in_project() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path());

        let args = DeployArgs {
            real_waits: false,
            record_connections: true,
        };
        deploy(dir.path(), args, OutputFormat::Json).await.unwrap();

        let records = recorded(dir.path());
        assert!(records["connections"]["l3_hot_to_l4"].is_object());
        assert!(records["connections"]["l3_hot_to_l5"].is_object());

        // The next load sees what the deploy recorded
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.inter_cloud.len(), 2);
    }

    #[tokio::test]
    async fn test_recorded_connections_released_on_destroy() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path());

        let args = DeployArgs {
            real_waits: false,
            record_connections: true,
        };
        destroy(dir.path(), args, OutputFormat::Json).await.unwrap();

        let records = recorded(dir.path());
        assert!(records["connections"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rehearsal_leaves_project_untouched() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path());

        deploy(dir.path(), DeployArgs::rehearsal(), OutputFormat::Json)
            .await
            .unwrap();
        assert!(!dir.path().join(INTER_CLOUD_FILE).exists());
    }
}
