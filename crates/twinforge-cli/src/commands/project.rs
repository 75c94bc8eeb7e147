//! Project commands: init, plan, package

use super::load_config;
use crate::output::{print_header, print_info, print_json, print_success, OutputFormat};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use twinforge_catalog::FunctionCatalog;
use twinforge_package::{scaffold_sources, ApplicationId, ArtifactPackager};
use twinforge_types::Provider;

pub fn init(project: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(project)?;
    let created = scaffold_sources(project, &FunctionCatalog::standard(), &config)?;

    match format {
        OutputFormat::Json => print_json(&created)?,
        OutputFormat::Text => {
            for dir in &created {
                println!("  {}", dir.display());
            }
            print_success(&format!("Scaffolded {} unit source(s)", created.len()));
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ProviderPlan {
    provider: Provider,
    units: Vec<String>,
    glue: Vec<&'static str>,
}

pub fn plan(project: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(project)?;
    let catalog = FunctionCatalog::standard();

    let plans = config
        .providers_in_use()
        .into_iter()
        .map(|provider| -> anyhow::Result<ProviderPlan> {
            Ok(ProviderPlan {
                provider,
                units: catalog
                    .resolve_for_provider(&config, provider)?
                    .iter()
                    .map(|u| u.to_string())
                    .collect(),
                glue: catalog.get_l0_for_config(&config, provider)?,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    match format {
        OutputFormat::Json => print_json(&plans)?,
        OutputFormat::Text => {
            for plan in &plans {
                print_header(&format!(
                    "{} ({} units)",
                    plan.provider.display_name(),
                    plan.units.len()
                ));
                for unit in &plan.units {
                    println!("  {unit}");
                }
                if plan.glue.is_empty() {
                    print_info("no cross-cloud glue");
                } else {
                    print_info(&format!("glue: {}", plan.glue.join(", ")));
                }
            }
        }
    }
    Ok(())
}

#[derive(Debug, Args)]
pub struct PackageArgs {
    /// Only package for this provider
    #[arg(long)]
    provider: Option<Provider>,
}

#[derive(Debug, Serialize)]
struct ArtifactRow {
    provider: Provider,
    application: ApplicationId,
    artifact: String,
    digest: String,
    bytes: usize,
}

pub async fn package(
    project: &Path,
    args: PackageArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = load_config(project)?;
    let packager = ArtifactPackager::default();
    let providers = match args.provider {
        Some(provider) => vec![provider],
        None => config.providers_in_use().into_iter().collect(),
    };

    let mut rows = Vec::new();
    for provider in providers {
        for application in ApplicationId::ALL {
            let Some(bundle) = packager
                .build_bundle_async(provider, application, project.to_path_buf(), config.clone())
                .await?
            else {
                continue;
            };
            rows.extend(bundle.artifacts.iter().map(|a| ArtifactRow {
                provider,
                application,
                artifact: a.name.clone(),
                digest: a.digest.clone(),
                bytes: a.bytes.len(),
            }));
        }
    }

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Text => {
            for row in &rows {
                println!(
                    "  {:<6} {:<8} {:<40} {:>8}  {}",
                    row.provider.as_str(),
                    row.application.as_str(),
                    row.artifact,
                    row.bytes,
                    &row.digest[..12.min(row.digest.len())]
                );
            }
            print_success(&format!("Built {} artifact(s)", rows.len()));
        }
    }
    Ok(())
}
