//! Twinforge CLI - Command-line interface for twin deployments
//!
//! Every command works on a project directory (`config.json`,
//! `config_providers.json`, `config_iot_devices.json` and `functions/`).
//! Deploy, destroy and info run against the in-memory dry-run backend, so
//! the full orchestration can be rehearsed without cloud credentials.
//! With `--record-connections` the inter-cloud records are written to the
//! project's `config_inter_cloud.json` instead of being kept in memory.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::{deploy, estimate, project};
use output::OutputFormat;

/// Twinforge CLI application
#[derive(Parser)]
#[command(name = "twinforge")]
#[command(about = "Twinforge - Multi-cloud digital twin deployment", long_about = None)]
#[command(version)]
struct Cli {
    /// Project directory
    #[arg(short, long, env = "TWINFORGE_PROJECT", default_value = ".")]
    project: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Write stub sources for every unit the configuration needs
    Init,

    /// Show the units and glue each provider hosts
    Plan,

    /// Build deployment bundles
    Package(project::PackageArgs),

    /// Rehearse a full deployment on the dry-run backend
    Deploy(deploy::DeployArgs),

    /// Rehearse a deployment followed by a full teardown
    Destroy(deploy::DeployArgs),

    /// Show what every layer owns and whether it is present
    Info,

    /// Estimate monthly compute cost per provider
    Estimate(estimate::EstimateArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let result = match cli.command {
        Commands::Init => project::init(&cli.project, cli.output),
        Commands::Plan => project::plan(&cli.project, cli.output),
        Commands::Package(args) => project::package(&cli.project, args, cli.output).await,
        Commands::Deploy(args) => deploy::deploy(&cli.project, args, cli.output).await,
        Commands::Destroy(args) => deploy::destroy(&cli.project, args, cli.output).await,
        Commands::Info => deploy::info(&cli.project, cli.output).await,
        Commands::Estimate(args) => estimate::execute(&cli.project, args, cli.output),
    };

    finish(result)
}

/// Report a failed command once, in colour, and turn it into the exit code
fn finish(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_failure_becomes_exit_code() {
        assert_eq!(finish(Ok(())), ExitCode::SUCCESS);

        let failed: anyhow::Result<()> =
            Err(anyhow::anyhow!("config.json missing")).context("loading project");
        assert_eq!(finish(failed), ExitCode::FAILURE);
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from(["twinforge", "--project", "demo", "-o", "json", "plan"])
            .unwrap();
        assert_eq!(cli.project, PathBuf::from("demo"));
        assert!(matches!(cli.output, OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Plan));
    }
}
