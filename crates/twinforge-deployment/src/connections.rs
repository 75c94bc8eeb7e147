//! Inter-cloud connection stores
//!
//! A connection record is written by the glue deploy step of its boundary
//! and read by every later consumer. Writes are last-write-wins.

use async_trait::async_trait;
use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;
use twinforge_types::config::INTER_CLOUD_FILE;
use twinforge_types::{Boundary, InterCloudConnection, InterCloudRecords};

const TOKEN_LEN: usize = 48;

#[derive(Debug, Error)]
pub enum ConnectionStoreError {
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed connection file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, ConnectionStoreError>;

/// Persisted connection records, keyed by boundary
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn get(&self, boundary: Boundary) -> StoreResult<Option<InterCloudConnection>>;

    async fn put(&self, boundary: Boundary, connection: InterCloudConnection) -> StoreResult<()>;

    async fn remove(&self, boundary: Boundary) -> StoreResult<Option<InterCloudConnection>>;

    async fn list(&self) -> StoreResult<InterCloudRecords>;
}

/// A fresh random token for a glue endpoint
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// In-memory store
#[derive(Debug, Default)]
pub struct InMemoryConnectionStore {
    records: DashMap<String, InterCloudConnection>,
}

impl InMemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously persisted records
    pub fn seeded(records: &InterCloudRecords) -> Self {
        let store = Self::new();
        for (key, connection) in records {
            store.records.insert(key.clone(), connection.clone());
        }
        store
    }
}

#[async_trait]
impl ConnectionStore for InMemoryConnectionStore {
    async fn get(&self, boundary: Boundary) -> StoreResult<Option<InterCloudConnection>> {
        Ok(self.records.get(boundary.key()).map(|c| c.clone()))
    }

    async fn put(&self, boundary: Boundary, connection: InterCloudConnection) -> StoreResult<()> {
        self.records.insert(boundary.key().to_string(), connection);
        Ok(())
    }

    async fn remove(&self, boundary: Boundary) -> StoreResult<Option<InterCloudConnection>> {
        Ok(self.records.remove(boundary.key()).map(|(_, c)| c))
    }

    async fn list(&self) -> StoreResult<InterCloudRecords> {
        Ok(self
            .records
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConnectionFile {
    #[serde(default)]
    connections: InterCloudRecords,
}

/// `config_inter_cloud.json` inside the project directory.
///
/// Mutations hold a lock across read-modify-write and replace the file by
/// writing a temporary sibling and renaming it over the original.
#[derive(Debug)]
pub struct FileConnectionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileConnectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn in_project(project_path: &Path) -> Self {
        Self::new(project_path.join(INTER_CLOUD_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoreResult<ConnectionFile> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ConnectionFile::default())
            }
            Err(source) => {
                return Err(ConnectionStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|source| ConnectionStoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, file: &ConnectionFile) -> StoreResult<()> {
        let io_err = |source| ConnectionStoreError::Io {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let json = serde_json::to_vec_pretty(file).map_err(|source| ConnectionStoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(&json).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        debug!(path = %self.path.display(), records = file.connections.len(), "Connections written");
        Ok(())
    }
}

#[async_trait]
impl ConnectionStore for FileConnectionStore {
    async fn get(&self, boundary: Boundary) -> StoreResult<Option<InterCloudConnection>> {
        let _guard = self.lock.lock().await;
        Ok(self.read()?.connections.remove(boundary.key()))
    }

    async fn put(&self, boundary: Boundary, connection: InterCloudConnection) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut file = self.read()?;
        file.connections.insert(boundary.key().to_string(), connection);
        self.write(&file)
    }

    async fn remove(&self, boundary: Boundary) -> StoreResult<Option<InterCloudConnection>> {
        let _guard = self.lock.lock().await;
        let mut file = self.read()?;
        let removed = file.connections.remove(boundary.key());
        if removed.is_some() {
            self.write(&file)?;
        }
        Ok(removed)
    }

    async fn list(&self) -> StoreResult<InterCloudRecords> {
        let _guard = self.lock.lock().await;
        Ok(self.read()?.connections)
    }
}
