//! Compute cost estimate

use super::load_config;
use crate::output::{print_info, print_json, OutputFormat};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use twinforge_catalog::FunctionCatalog;
use twinforge_types::{ComputeCostEstimator, ComputeFormulaPolicy, ComputeUsage, Provider};

#[derive(Debug, Args)]
pub struct EstimateArgs {
    /// Monthly invocations per unit
    #[arg(long, default_value_t = 1_000_000)]
    invocations: u64,

    /// Average duration per invocation in milliseconds
    #[arg(long, default_value_t = 200.0)]
    duration_ms: f64,

    /// Memory per unit in MB
    #[arg(long, default_value_t = 256)]
    memory_mb: u32,

    /// Price every provider with its own formula
    #[arg(long)]
    native: bool,
}

#[derive(Debug, Serialize)]
struct ProviderEstimate {
    provider: Provider,
    formula: Provider,
    units: usize,
    monthly_usd: f64,
}

pub fn execute(project: &Path, args: EstimateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(project)?;
    let catalog = FunctionCatalog::standard();
    let estimator = match args.native {
        true => ComputeCostEstimator::new(ComputeFormulaPolicy::Native),
        false => ComputeCostEstimator::default(),
    };
    let usage = ComputeUsage {
        invocations: args.invocations,
        avg_duration_ms: args.duration_ms,
        memory_mb: args.memory_mb,
    };

    let mut estimates = Vec::new();
    for provider in config.providers_in_use() {
        let units = catalog.resolve_for_provider(&config, provider)?.len();
        estimates.push(ProviderEstimate {
            provider,
            formula: estimator.formula_provider(provider),
            units,
            monthly_usd: estimator.monthly_cost(provider, &usage) * units as f64,
        });
    }

    match format {
        OutputFormat::Json => print_json(&estimates)?,
        OutputFormat::Text => {
            for e in &estimates {
                println!(
                    "  {:<20} {:>3} units  ${:>10.2}/month",
                    e.provider.display_name(),
                    e.units,
                    e.monthly_usd
                );
                if e.formula != e.provider {
                    print_info(&format!(
                        "{} compute priced with the {} formula",
                        e.provider.display_name(),
                        e.formula.display_name()
                    ));
                }
            }
        }
    }
    Ok(())
}
