//! Bundles, artifacts and their manifests

use crate::application::{ApplicationId, PackagingPolicy};
use crate::error::{PackagingError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Read;
use twinforge_catalog::DeployableUnit;
use twinforge_types::Provider;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const DISPATCH_FILE: &str = "dispatch.json";

/// A unit as recorded inside an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestUnit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl ManifestUnit {
    pub fn id(&self) -> String {
        match &self.device {
            Some(device) => format!("{}-{}", self.name, device),
            None => self.name.clone(),
        }
    }
}

impl From<&DeployableUnit> for ManifestUnit {
    fn from(unit: &DeployableUnit) -> Self {
        Self {
            name: unit.name().to_string(),
            device: unit.device.as_ref().map(|d| d.to_string()),
        }
    }
}

/// `manifest.json` at the root of every artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub provider: Provider,
    pub application: ApplicationId,
    pub policy: PackagingPolicy,
    pub units: Vec<ManifestUnit>,
}

/// Generated entry point of a multiplexed artifact: route → unit directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchTable {
    pub routes: BTreeMap<String, String>,
}

/// One uploadable archive
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    /// gzip-compressed tar
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of `bytes`
    pub digest: String,
}

impl Artifact {
    pub(crate) fn seal(name: String, entries: &[(String, Vec<u8>)]) -> Result<Self> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            // Fixed mtime keeps digests reproducible
            header.set_mtime(0);
            header.set_cksum();
            builder.append_data(&mut header, path, data.as_slice())?;
        }

        let bytes = builder.into_inner()?.finish()?;
        let digest = hex_digest(&bytes);

        Ok(Self {
            name,
            bytes,
            digest,
        })
    }

    /// Paths and contents of every file in the archive
    pub fn entries(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        let mut archive = tar::Archive::new(GzDecoder::new(self.bytes.as_slice()));
        let mut files = BTreeMap::new();

        for entry in archive.entries()? {
            let mut entry = entry?;
            let path = entry.path()?.to_string_lossy().into_owned();
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            files.insert(path, data);
        }

        Ok(files)
    }

    pub fn manifest(&self) -> Result<Manifest> {
        let entries = self.entries()?;
        let raw = entries
            .get(MANIFEST_FILE)
            .ok_or_else(|| PackagingError::MissingManifest(self.name.clone()))?;
        Ok(serde_json::from_slice(raw)?)
    }

    pub fn dispatch_table(&self) -> Result<Option<DispatchTable>> {
        match self.entries()?.get(DISPATCH_FILE) {
            Some(raw) => Ok(Some(serde_json::from_slice(raw)?)),
            None => Ok(None),
        }
    }

    pub fn verify(&self) -> bool {
        hex_digest(&self.bytes) == self.digest
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .field("digest", &self.digest)
            .finish()
    }
}

/// Everything one application uploads to one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub provider: Provider,
    pub application: ApplicationId,
    pub policy: PackagingPolicy,
    pub artifacts: Vec<Artifact>,
}

impl Bundle {
    /// Read the unit list back out of the artifact manifests
    pub fn decode_units(&self) -> Result<Vec<ManifestUnit>> {
        let mut units = Vec::new();
        for artifact in &self.artifacts {
            units.extend(artifact.manifest()?.units);
        }
        Ok(units)
    }

    /// Artifact carrying the given unit id
    pub fn artifact_for(&self, unit_id: &str) -> Option<&Artifact> {
        match self.policy {
            PackagingPolicy::PerUnit => self.artifacts.iter().find(|a| a.name == unit_id),
            PackagingPolicy::Multiplexed => self.artifacts.first(),
        }
    }

    /// What to upload where, given the application's deployed units in
    /// order. Per-unit bundles upload each unit's own artifact. A
    /// multiplexed bundle is one app: its artifact goes to the first unit,
    /// which hosts the dispatch table for the rest.
    pub fn uploads<'a>(&'a self, unit_ids: &[&'a str]) -> Vec<(&'a str, &'a Artifact)> {
        match self.policy {
            PackagingPolicy::PerUnit => unit_ids
                .iter()
                .filter_map(|id| self.artifact_for(id).map(|a| (*id, a)))
                .collect(),
            PackagingPolicy::Multiplexed => unit_ids
                .first()
                .zip(self.artifacts.first())
                .map(|(id, a)| vec![(*id, a)])
                .unwrap_or_default(),
        }
    }

    pub fn total_size(&self) -> usize {
        self.artifacts.iter().map(|a| a.bytes.len()).sum()
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_is_reproducible() {
        let entries = vec![
            ("unit/handler.py".to_string(), b"def handler(): pass".to_vec()),
            (MANIFEST_FILE.to_string(), b"{}".to_vec()),
        ];
        let a = Artifact::seal("persister".into(), &entries).unwrap();
        let b = Artifact::seal("persister".into(), &entries).unwrap();
        assert_eq!(a.digest, b.digest);
        assert!(a.verify());
        assert_eq!(a.entries().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_manifest() {
        let artifact = Artifact::seal("x".into(), &[]).unwrap();
        assert!(matches!(
            artifact.manifest(),
            Err(PackagingError::MissingManifest(_))
        ));
    }
}
