//! Project scaffolding
//!
//! Lays out a stub source directory for every unit a configuration resolves
//! to, so a fresh project can be packaged and deployed immediately.
//! Existing sources are never overwritten.

use crate::error::{PackagingError, Result};
use crate::packager::{FUNCTIONS_DIR, SHARED_DIR};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use twinforge_catalog::{DeployableUnit, FunctionCatalog};
use twinforge_types::{ProjectConfig, Provider};

/// Entry file written into each stub source directory
pub const HANDLER_FILE: &str = "handler.py";

/// Directory a unit's source is read from. Per-device units share
/// `default`.
pub fn source_path(project_path: &Path, provider: Provider, unit: &DeployableUnit) -> PathBuf {
    let base = project_path
        .join(FUNCTIONS_DIR)
        .join(provider.as_str())
        .join(unit.layer().code())
        .join(unit.definition.source_dir());
    match unit.device {
        Some(_) => base.join("default"),
        None => base,
    }
}

/// Write stub sources for every unit of every provider in use.
///
/// Returns the directories created; existing directories are left alone.
pub fn scaffold_sources(
    project_path: &Path,
    catalog: &FunctionCatalog,
    config: &ProjectConfig,
) -> Result<Vec<PathBuf>> {
    let mut dirs = BTreeSet::new();
    for provider in config.providers_in_use() {
        for unit in catalog.resolve_for_provider(config, provider)? {
            dirs.insert((provider, unit.name(), source_path(project_path, provider, &unit)));
        }
    }

    let mut created = Vec::new();
    for (provider, name, dir) in dirs {
        if dir.is_dir() {
            continue;
        }
        write_file(&dir.join(HANDLER_FILE), &stub_handler(provider, name))?;
        debug!(path = %dir.display(), "Scaffolded unit source");
        created.push(dir);
    }

    let shared = project_path.join(FUNCTIONS_DIR).join(SHARED_DIR);
    if !shared.is_dir() {
        write_file(&shared.join("__init__.py"), "")?;
    }

    info!(created = created.len(), "Scaffolded function sources");
    Ok(created)
}

fn stub_handler(provider: Provider, unit: &str) -> String {
    format!(
        "# {unit} ({provider})\n\ndef handler(event, context=None):\n    return {{\"unit\": \"{unit}\", \"status\": \"ok\"}}\n"
    )
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let io = |source| PackagingError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    std::fs::write(path, contents).map_err(io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ApplicationId, ArtifactPackager};
    use tempfile::TempDir;
    use twinforge_types::{DeviceConfig, DeviceId, LayerSlot, TwinName};

    fn config() -> ProjectConfig {
        ProjectConfig::single_provider(TwinName::new("plant").unwrap(), Provider::Aws)
            .with_provider(LayerSlot::L2, Provider::Azure)
            .with_device(DeviceConfig::new(DeviceId::new("s1").unwrap()))
            .with_device(DeviceConfig::new(DeviceId::new("s2").unwrap()))
    }

    #[test]
    fn test_scaffolded_project_packages() {
        let dir = TempDir::new().unwrap();
        let catalog = FunctionCatalog::standard();
        let config = config();

        let created = scaffold_sources(dir.path(), &catalog, &config).unwrap();
        assert!(!created.is_empty());

        let packager = ArtifactPackager::new(catalog);
        let bundle = packager
            .build_bundle(Provider::Azure, ApplicationId::L2, dir.path(), &config)
            .unwrap()
            .unwrap();
        // persister + one processor per device
        assert_eq!(bundle.decode_units().unwrap().len(), 3);
    }

    #[test]
    fn test_existing_sources_are_kept() {
        let dir = TempDir::new().unwrap();
        let catalog = FunctionCatalog::standard();
        let config = config();

        scaffold_sources(dir.path(), &catalog, &config).unwrap();
        let handler = dir.path().join("functions/azure/l2/persister").join(HANDLER_FILE);
        std::fs::write(&handler, "custom").unwrap();

        let again = scaffold_sources(dir.path(), &catalog, &config).unwrap();
        assert!(again.is_empty());
        assert_eq!(std::fs::read_to_string(handler).unwrap(), "custom");
    }
}
