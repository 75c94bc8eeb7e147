//! The artifact packager
//!
//! Source layout inside a project:
//!
//! ```text
//! functions/
//!   _shared/                      shared by every provider
//!   <provider>/
//!     _shared/                    shared by one provider
//!     <layer>/<unit>/             one directory per unit
//!     l2/processors/<device>/     per-device processors
//!     l2/processors/default/      fallback processor
//! ```

use crate::application::{ApplicationId, PackagingPolicy};
use crate::bundle::{Artifact, Bundle, DispatchTable, Manifest, ManifestUnit, DISPATCH_FILE, MANIFEST_FILE};
use crate::error::{PackagingError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use twinforge_catalog::{DeployableUnit, FunctionCatalog};
use twinforge_types::{ProjectConfig, Provider};
use walkdir::WalkDir;

pub const FUNCTIONS_DIR: &str = "functions";
pub const SHARED_DIR: &str = "_shared";
const DEFAULT_PROCESSOR: &str = "default";

/// Builds upload bundles from a project's function sources
#[derive(Debug, Clone, Default)]
pub struct ArtifactPackager {
    catalog: FunctionCatalog,
}

impl ArtifactPackager {
    pub fn new(catalog: FunctionCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &FunctionCatalog {
        &self.catalog
    }

    /// Package one application for one provider.
    ///
    /// The unit set is exactly what the catalog resolves for the
    /// application's layer. Returns `None` when that set is empty.
    #[instrument(skip_all, fields(provider = %provider, application = %application))]
    pub fn build_bundle(
        &self,
        provider: Provider,
        application: ApplicationId,
        project_path: &Path,
        config: &ProjectConfig,
    ) -> Result<Option<Bundle>> {
        let units = self
            .catalog
            .resolve_for_layer(config, provider, application.layer())?;
        if units.is_empty() {
            debug!("No units to package");
            return Ok(None);
        }

        let functions = project_path.join(FUNCTIONS_DIR);
        let mut shared = collect_dir(&functions.join(SHARED_DIR), &format!("{SHARED_DIR}/common"))?;
        shared.extend(collect_dir(
            &functions.join(provider.as_str()).join(SHARED_DIR),
            &format!("{SHARED_DIR}/{provider}"),
        )?);

        let sources = units
            .iter()
            .map(|unit| locate_source(&functions, provider, unit).map(|dir| (unit, dir)))
            .collect::<Result<Vec<_>>>()?;

        let policy = PackagingPolicy::for_provider(provider);
        let manifest_for = |units: Vec<ManifestUnit>| Manifest {
            provider,
            application,
            policy,
            units,
        };

        let artifacts = match policy {
            PackagingPolicy::PerUnit => sources
                .iter()
                .map(|(unit, dir)| {
                    let mut entries = collect_dir(dir, "unit")?;
                    entries.extend(shared.iter().cloned());
                    entries.push(json_entry(MANIFEST_FILE, &manifest_for(vec![(*unit).into()]))?);
                    Artifact::seal(unit.id(), &entries)
                })
                .collect::<Result<Vec<_>>>()?,
            PackagingPolicy::Multiplexed => {
                let mut entries = Vec::new();
                let mut dispatch = DispatchTable::default();
                for (unit, dir) in &sources {
                    let prefix = format!("units/{}", unit.id());
                    entries.extend(collect_dir(dir, &prefix)?);
                    dispatch.routes.insert(unit.id(), prefix);
                }
                entries.extend(shared.iter().cloned());
                entries.push(json_entry(DISPATCH_FILE, &dispatch)?);
                entries.push(json_entry(
                    MANIFEST_FILE,
                    &manifest_for(units.iter().map(ManifestUnit::from).collect()),
                )?);
                vec![Artifact::seal(application.to_string(), &entries)?]
            }
        };

        let bundle = Bundle {
            provider,
            application,
            policy,
            artifacts,
        };

        info!(
            units = units.len(),
            artifacts = bundle.artifacts.len(),
            bytes = bundle.total_size(),
            "Bundle built"
        );

        Ok(Some(bundle))
    }

    /// [`build_bundle`](Self::build_bundle) on the blocking pool
    pub async fn build_bundle_async(
        &self,
        provider: Provider,
        application: ApplicationId,
        project_path: PathBuf,
        config: ProjectConfig,
    ) -> Result<Option<Bundle>> {
        let packager = self.clone();
        tokio::task::spawn_blocking(move || {
            packager.build_bundle(provider, application, &project_path, &config)
        })
        .await
        .map_err(|e| PackagingError::Task(e.to_string()))?
    }
}

/// Source directory of a unit. Per-device units fall back to `default`.
fn locate_source(functions: &Path, provider: Provider, unit: &DeployableUnit) -> Result<PathBuf> {
    let base = functions
        .join(provider.as_str())
        .join(unit.layer().code())
        .join(unit.definition.source_dir());

    let candidates = match &unit.device {
        Some(device) => vec![base.join(device.as_str()), base.join(DEFAULT_PROCESSOR)],
        None => vec![base],
    };

    candidates
        .iter()
        .find(|dir| dir.is_dir())
        .cloned()
        .ok_or_else(|| PackagingError::MissingSource {
            unit: unit.id(),
            path: candidates[0].clone(),
        })
}

/// Every file under `dir`, keyed by `prefix/<relative path>`, in name order.
/// A missing directory contributes nothing.
fn collect_dir(dir: &Path, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| PackagingError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| PackagingError::Task(e.to_string()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let data = std::fs::read(entry.path()).map_err(|source| PackagingError::Io {
            path: entry.path().to_path_buf(),
            source,
        })?;
        files.push((format!("{prefix}/{name}"), data));
    }

    Ok(files)
}

fn json_entry<T: serde::Serialize>(name: &str, value: &T) -> Result<(String, Vec<u8>)> {
    Ok((name.to_string(), serde_json::to_vec_pretty(value)?))
}
