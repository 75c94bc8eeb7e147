//! In-memory control plane
//!
//! Backs dry runs and tests. Resources live in a concurrent map; every
//! mutating call is appended to a journal so callers can assert ordering.
//! Faults can be injected per operation, per resource delete, and as a
//! number of propagation failures after each new role.

use crate::adapter::{
    classifier_for, propagation_error, CloudError, CloudResult, ProviderAdapter, ResourceHandle,
    UnitSpec,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::debug;
use twinforge_naming::{scheme_for, NamingScheme, ResourceKind};
use twinforge_package::Artifact;
use twinforge_resilience::TransientClassifier;
use twinforge_types::Provider;
use uuid::Uuid;

/// A mutating call, as recorded in the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalEntry {
    Created { kind: ResourceKind, name: String },
    Assigned { role: String, scope: String },
    Uploaded { unit: String, digest: String },
    Deleted { kind: ResourceKind, name: String },
}

/// Control-plane operations faults can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateRole,
    AssignRole,
    CreateUnit,
    UploadCode,
    CreateStorage,
    CreateResource,
    Describe,
    Delete,
}

#[derive(Debug, Clone)]
struct StoredResource {
    handle: ResourceHandle,
    properties: serde_json::Value,
}

/// A [`ProviderAdapter`] keeping all state in memory
pub struct InMemoryControlPlane {
    provider: Provider,
    resources: DashMap<(ResourceKind, String), StoredResource>,
    journal: Mutex<Vec<JournalEntry>>,
    faults: DashMap<Operation, VecDeque<CloudError>>,
    delete_faults: DashMap<(ResourceKind, String), CloudError>,
    /// Failures each new role produces before units can use it
    propagation_failures: u32,
    pending_propagation: DashMap<String, u32>,
}

impl InMemoryControlPlane {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            resources: DashMap::new(),
            journal: Mutex::new(Vec::new()),
            faults: DashMap::new(),
            delete_faults: DashMap::new(),
            propagation_failures: 0,
            pending_propagation: DashMap::new(),
        }
    }

    /// Fail the first `n` unit creations against every newly created role
    pub fn with_propagation_failures(mut self, n: u32) -> Self {
        self.propagation_failures = n;
        self
    }

    /// Fail the next call of `operation` with `error`. Queued errors are
    /// consumed in order.
    pub fn fail_next(&self, operation: Operation, error: CloudError) {
        self.faults.entry(operation).or_default().push_back(error);
    }

    /// Make every delete of one resource fail
    pub fn fail_deletes_of(&self, kind: ResourceKind, name: &str, error: CloudError) {
        self.delete_faults.insert((kind, name.to_string()), error);
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.journal.lock().map(|j| j.clone()).unwrap_or_default()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.resources.contains_key(&(kind, name.to_string()))
    }

    /// Properties a resource was created with
    pub fn properties(&self, kind: ResourceKind, name: &str) -> Option<serde_json::Value> {
        self.resources
            .get(&(kind, name.to_string()))
            .map(|r| r.properties.clone())
    }

    /// Drop a resource behind the orchestrator's back
    pub fn remove_silently(&self, kind: ResourceKind, name: &str) -> bool {
        self.resources.remove(&(kind, name.to_string())).is_some()
    }

    fn record(&self, entry: JournalEntry) {
        if let Ok(mut journal) = self.journal.lock() {
            journal.push(entry);
        }
    }

    fn injected(&self, operation: Operation) -> CloudResult<()> {
        match self.faults.get_mut(&operation).and_then(|mut q| q.pop_front()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn insert(
        &self,
        kind: ResourceKind,
        name: &str,
        endpoint: Option<String>,
        properties: serde_json::Value,
        upsert: bool,
    ) -> CloudResult<ResourceHandle> {
        let key = (kind, name.to_string());
        if !upsert && self.resources.contains_key(&key) {
            return Err(CloudError::new(
                self.provider,
                "AlreadyExists",
                format!("{kind} {name} already exists"),
            )
            .with_status(409));
        }

        let handle = ResourceHandle {
            kind,
            name: name.to_string(),
            id: format!("{}:{}:{}", self.provider, kind, Uuid::new_v4()),
            endpoint,
            created_at: Utc::now(),
        };
        self.resources.insert(
            key,
            StoredResource {
                handle: handle.clone(),
                properties,
            },
        );
        self.record(JournalEntry::Created {
            kind,
            name: name.to_string(),
        });
        debug!(provider = %self.provider, kind = %kind, name, "Created");
        Ok(handle)
    }

    fn endpoint(&self, name: &str) -> String {
        match self.provider {
            Provider::Aws => format!("https://{name}.lambda-url.local.on.aws/"),
            Provider::Azure => format!("https://{name}.azurewebsites.net/api/{name}"),
            Provider::Gcp => format!("https://{name}.run.app/"),
        }
    }
}

impl std::fmt::Debug for InMemoryControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryControlPlane")
            .field("provider", &self.provider)
            .field("resources", &self.resources.len())
            .finish()
    }
}

#[async_trait]
impl ProviderAdapter for InMemoryControlPlane {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn naming(&self) -> Arc<dyn NamingScheme> {
        scheme_for(self.provider)
    }

    fn transient_classifier(&self) -> Arc<dyn TransientClassifier<CloudError>> {
        classifier_for(self.provider)
    }

    async fn create_role(&self, name: &str) -> CloudResult<ResourceHandle> {
        self.injected(Operation::CreateRole)?;
        let handle = self.insert(ResourceKind::Role, name, None, serde_json::Value::Null, false)?;
        if self.propagation_failures > 0 {
            self.pending_propagation
                .insert(name.to_string(), self.propagation_failures);
        }
        Ok(handle)
    }

    async fn assign_role(&self, role: &str, scope: &str) -> CloudResult<()> {
        self.injected(Operation::AssignRole)?;
        if !self.contains(ResourceKind::Role, role) {
            return Err(CloudError::not_found(self.provider, role));
        }
        self.record(JournalEntry::Assigned {
            role: role.to_string(),
            scope: scope.to_string(),
        });
        Ok(())
    }

    async fn create_unit(&self, spec: &UnitSpec) -> CloudResult<ResourceHandle> {
        self.injected(Operation::CreateUnit)?;
        if !self.contains(ResourceKind::Role, &spec.role) {
            return Err(CloudError::not_found(self.provider, &spec.role));
        }
        if let Some(mut remaining) = self.pending_propagation.get_mut(&spec.role) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(propagation_error(self.provider, &spec.role));
            }
        }

        let endpoint = spec.public.then(|| self.endpoint(&spec.name));
        let properties = serde_json::to_value(spec).unwrap_or_default();
        self.insert(ResourceKind::Function, &spec.name, endpoint, properties, true)
    }

    async fn upload_code(&self, unit: &str, artifact: &Artifact) -> CloudResult<()> {
        self.injected(Operation::UploadCode)?;
        if !self.contains(ResourceKind::Function, unit) {
            return Err(CloudError::not_found(self.provider, unit));
        }
        self.record(JournalEntry::Uploaded {
            unit: unit.to_string(),
            digest: artifact.digest.clone(),
        });
        Ok(())
    }

    async fn create_storage_container(&self, name: &str) -> CloudResult<ResourceHandle> {
        self.injected(Operation::CreateStorage)?;
        self.insert(
            ResourceKind::StorageContainer,
            name,
            None,
            serde_json::Value::Null,
            false,
        )
    }

    async fn create_resource(
        &self,
        kind: ResourceKind,
        name: &str,
        properties: &serde_json::Value,
    ) -> CloudResult<ResourceHandle> {
        self.injected(Operation::CreateResource)?;
        self.insert(kind, name, None, properties.clone(), false)
    }

    async fn describe_resource(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> CloudResult<Option<ResourceHandle>> {
        self.injected(Operation::Describe)?;
        Ok(self
            .resources
            .get(&(kind, name.to_string()))
            .map(|r| r.handle.clone()))
    }

    async fn delete_resource(&self, kind: ResourceKind, name: &str) -> CloudResult<()> {
        self.injected(Operation::Delete)?;
        let key = (kind, name.to_string());
        if let Some(error) = self.delete_faults.get(&key) {
            return Err(error.clone());
        }
        match self.resources.remove(&key) {
            Some(_) => {
                self.pending_propagation.remove(name);
                self.record(JournalEntry::Deleted {
                    kind,
                    name: name.to_string(),
                });
                Ok(())
            }
            None => Err(CloudError::not_found(self.provider, name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn unit(name: &str, role: &str) -> UnitSpec {
        UnitSpec {
            name: name.into(),
            role: role.into(),
            environment: BTreeMap::new(),
            public: true,
        }
    }

    #[tokio::test]
    async fn test_units_need_their_role() {
        let plane = InMemoryControlPlane::new(Provider::Aws);
        let err = plane.create_unit(&unit("f", "r")).await.unwrap_err();
        assert!(err.is_not_found());

        plane.create_role("r").await.unwrap();
        let handle = plane.create_unit(&unit("f", "r")).await.unwrap();
        assert!(handle.endpoint.unwrap().starts_with("https://f."));
    }

    #[tokio::test]
    async fn test_propagation_failures() {
        let plane = InMemoryControlPlane::new(Provider::Gcp).with_propagation_failures(2);
        plane.create_role("sa").await.unwrap();

        for _ in 0..2 {
            let err = plane.create_unit(&unit("f", "sa")).await.unwrap_err();
            assert!(plane.transient_classifier().is_transient(&err));
        }
        assert!(plane.create_unit(&unit("f", "sa")).await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_faults_are_consumed() {
        let plane = InMemoryControlPlane::new(Provider::Azure);
        plane.fail_next(
            Operation::CreateStorage,
            CloudError::new(Provider::Azure, "Conflict", "busy").with_status(409),
        );

        assert!(plane.create_storage_container("hot").await.is_err());
        assert!(plane.create_storage_container("hot").await.is_ok());

        let taken = plane.create_storage_container("hot").await.unwrap_err();
        assert_eq!(taken.status, Some(409));
        assert!(!plane.transient_classifier().is_transient(&taken));
    }

    #[tokio::test]
    async fn test_delete_of_absent_resource() {
        let plane = InMemoryControlPlane::new(Provider::Aws);
        let err = plane
            .delete_resource(ResourceKind::Queue, "missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(plane.journal().is_empty());
    }
}
