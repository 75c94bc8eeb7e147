//! CLI command implementations

pub mod deploy;
pub mod estimate;
pub mod project;

use anyhow::Context;
use std::path::Path;
use twinforge_types::ProjectConfig;

/// Load and validate the project configuration
pub fn load_config(project: &Path) -> anyhow::Result<ProjectConfig> {
    ProjectConfig::load(project)
        .with_context(|| format!("loading project at {}", project.display()))
}
