//! Cloud control-plane capabilities
//!
//! One [`ProviderAdapter`] per provider, consumed polymorphically by the
//! orchestrators. Concrete SDK bindings live outside this crate; the
//! in-memory control plane in [`crate::memory`] implements the trait for
//! dry runs and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use twinforge_naming::{NamingScheme, ResourceKind};
use twinforge_package::Artifact;
use twinforge_resilience::TransientClassifier;
use twinforge_types::Provider;

/// Error code used for lookups and deletes of absent resources
pub const NOT_FOUND: &str = "NotFound";

/// A failed control-plane call, as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{provider} {code}: {message}")]
pub struct CloudError {
    pub provider: Provider,
    pub code: String,
    pub message: String,
    /// HTTP status, when the provider reports one
    pub status: Option<u16>,
}

impl CloudError {
    pub fn new(provider: Provider, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider,
            code: code.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn not_found(provider: Provider, name: &str) -> Self {
        Self::new(provider, NOT_FOUND, format!("{name} does not exist")).with_status(404)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == NOT_FOUND || self.status == Some(404)
    }
}

pub type CloudResult<T> = std::result::Result<T, CloudError>;

/// A resource as the control plane knows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub name: String,
    /// Provider-assigned identifier (ARN, resource id, ...)
    pub id: String,
    /// Invocation URL of publicly reachable units
    pub endpoint: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What to create for one compute unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub name: String,
    /// Name of the role the unit runs as
    pub role: String,
    pub environment: BTreeMap<String, String>,
    /// Expose an invocation endpoint reachable from other clouds
    pub public: bool,
}

/// The control-plane operations the orchestrators need from a provider.
///
/// `create_unit` has upsert semantics so that re-deploying refreshes a
/// unit's configuration. Every other `create_*` call fails if the resource
/// exists; callers describe first.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    fn naming(&self) -> Arc<dyn NamingScheme>;

    /// Recognises this provider's propagation-delay errors
    fn transient_classifier(&self) -> Arc<dyn TransientClassifier<CloudError>>;

    async fn create_role(&self, name: &str) -> CloudResult<ResourceHandle>;

    /// Grant `role` access to everything under `scope`
    async fn assign_role(&self, role: &str, scope: &str) -> CloudResult<()>;

    async fn create_unit(&self, spec: &UnitSpec) -> CloudResult<ResourceHandle>;

    async fn upload_code(&self, unit: &str, artifact: &Artifact) -> CloudResult<()>;

    async fn create_storage_container(&self, name: &str) -> CloudResult<ResourceHandle>;

    async fn create_resource(
        &self,
        kind: ResourceKind,
        name: &str,
        properties: &serde_json::Value,
    ) -> CloudResult<ResourceHandle>;

    /// `Ok(None)` when the resource does not exist
    async fn describe_resource(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> CloudResult<Option<ResourceHandle>>;

    async fn delete_resource(&self, kind: ResourceKind, name: &str) -> CloudResult<()>;
}

impl fmt::Debug for dyn ProviderAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProviderAdapter({})", self.provider())
    }
}

/// AWS: IAM roles take a few seconds before Lambda can assume them
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsTransientClassifier;

impl TransientClassifier<CloudError> for AwsTransientClassifier {
    fn is_transient(&self, error: &CloudError) -> bool {
        matches!(
            error.code.as_str(),
            "ResourceConflictException" | "TooManyRequestsException" | "ThrottlingException"
        ) || error.message.contains("cannot be assumed")
    }
}

/// Azure: fresh principals are invisible to RBAC for a while. A 409 is an
/// operation still in flight, except when the name is already taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureTransientClassifier;

impl TransientClassifier<CloudError> for AzureTransientClassifier {
    fn is_transient(&self, error: &CloudError) -> bool {
        if error.code.ends_with("AlreadyExists") {
            return false;
        }
        matches!(error.code.as_str(), "PrincipalNotFound" | "AuthorizationFailed")
            || matches!(error.status, Some(409) | Some(429))
    }
}

/// Google Cloud: new service accounts are denied until IAM converges
#[derive(Debug, Clone, Copy, Default)]
pub struct GcpTransientClassifier;

impl TransientClassifier<CloudError> for GcpTransientClassifier {
    fn is_transient(&self, error: &CloudError) -> bool {
        matches!(
            error.code.as_str(),
            "PERMISSION_DENIED" | "FAILED_PRECONDITION" | "UNAVAILABLE"
        )
    }
}

/// Default classifier for a provider
pub fn classifier_for(provider: Provider) -> Arc<dyn TransientClassifier<CloudError>> {
    match provider {
        Provider::Aws => Arc::new(AwsTransientClassifier),
        Provider::Azure => Arc::new(AzureTransientClassifier),
        Provider::Gcp => Arc::new(GcpTransientClassifier),
    }
}

/// The error each provider raises while a new identity propagates
pub fn propagation_error(provider: Provider, role: &str) -> CloudError {
    match provider {
        Provider::Aws => CloudError::new(
            provider,
            "InvalidParameterValueException",
            format!("The role defined for the function ({role}) cannot be assumed by Lambda"),
        )
        .with_status(400),
        Provider::Azure => CloudError::new(
            provider,
            "PrincipalNotFound",
            format!("Principal {role} does not exist in the directory"),
        )
        .with_status(400),
        Provider::Gcp => CloudError::new(
            provider,
            "PERMISSION_DENIED",
            format!("Permission denied on service account {role}"),
        )
        .with_status(403),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagation_errors_are_transient() {
        for provider in Provider::ALL {
            let classifier = classifier_for(provider);
            assert!(
                classifier.is_transient(&propagation_error(provider, "plant-role")),
                "{provider}"
            );
        }
    }

    #[test]
    fn test_fatal_errors() {
        let denied = CloudError::new(Provider::Aws, "AccessDeniedException", "no").with_status(403);
        assert!(!AwsTransientClassifier.is_transient(&denied));

        let conflict = CloudError::new(Provider::Azure, "Conflict", "busy").with_status(409);
        assert!(AzureTransientClassifier.is_transient(&conflict));
        assert!(!AzureTransientClassifier.is_transient(&CloudError::not_found(Provider::Azure, "x")));

        let exists = CloudError::new(Provider::Azure, "AlreadyExists", "taken").with_status(409);
        assert!(!AzureTransientClassifier.is_transient(&exists));
        let account = CloudError::new(Provider::Azure, "StorageAccountAlreadyExists", "taken")
            .with_status(409);
        assert!(!AzureTransientClassifier.is_transient(&account));

        let quota = CloudError::new(Provider::Gcp, "RESOURCE_EXHAUSTED", "quota");
        assert!(!GcpTransientClassifier.is_transient(&quota));
    }

    #[test]
    fn test_not_found() {
        assert!(CloudError::not_found(Provider::Gcp, "bucket").is_not_found());
        assert!(CloudError::new(Provider::Aws, "NoSuchEntity", "gone")
            .with_status(404)
            .is_not_found());
    }
}
