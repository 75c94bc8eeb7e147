//! Per-provider naming schemes

use crate::constraints::{Charset, NameConstraints};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use twinforge_types::{DeviceId, Provider, TwinName};

/// Kinds of resources the orchestrator names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ResourceGroup,
    Role,
    Function,
    StorageContainer,
    Queue,
    IotRegistry,
    IotThing,
    TwinGraph,
    TwinEntity,
    Dashboard,
    DataSource,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ResourceGroup => "resource-group",
            ResourceKind::Role => "role",
            ResourceKind::Function => "function",
            ResourceKind::StorageContainer => "storage",
            ResourceKind::Queue => "queue",
            ResourceKind::IotRegistry => "iot-registry",
            ResourceKind::IotThing => "iot-thing",
            ResourceKind::TwinGraph => "twin-graph",
            ResourceKind::TwinEntity => "twin-entity",
            ResourceKind::Dashboard => "dashboard",
            ResourceKind::DataSource => "data-source",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives resource names for one provider.
///
/// Implementations only supply constraints; the derivation itself is shared
/// so every provider gets the same determinism and injectivity.
pub trait NamingScheme: Send + Sync {
    fn provider(&self) -> Provider;

    fn constraints(&self, kind: ResourceKind) -> NameConstraints;

    /// Name a resource. Pure: identical inputs always yield identical names.
    fn name(
        &self,
        twin: &TwinName,
        component: &str,
        device: Option<&DeviceId>,
        kind: ResourceKind,
    ) -> String {
        let mut parts = vec![twin.as_str(), component];
        if let Some(device) = device {
            parts.push(device.as_str());
        }
        self.constraints(kind).apply(&parts)
    }
}

/// AWS: Lambda, IAM, SQS and IoT Core accept mixed case with `-` and `_`
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsNaming;

impl NamingScheme for AwsNaming {
    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn constraints(&self, kind: ResourceKind) -> NameConstraints {
        match kind {
            ResourceKind::StorageContainer => {
                NameConstraints::new(63, Charset::AlnumHyphen).lowercase().min_len(3)
            }
            ResourceKind::Queue | ResourceKind::Function | ResourceKind::Role => {
                NameConstraints::new(64, Charset::AlnumHyphenUnderscore)
            }
            _ => NameConstraints::new(128, Charset::AlnumHyphenUnderscore),
        }
    }
}

/// Azure: storage accounts are 3-24 lowercase alphanumerics; everything
/// else takes lowercase names with hyphens.
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureNaming;

impl NamingScheme for AzureNaming {
    fn provider(&self) -> Provider {
        Provider::Azure
    }

    fn constraints(&self, kind: ResourceKind) -> NameConstraints {
        match kind {
            ResourceKind::StorageContainer => {
                NameConstraints::new(24, Charset::Alnum).lowercase().min_len(3)
            }
            ResourceKind::ResourceGroup => NameConstraints::new(90, Charset::AlnumHyphen).lowercase(),
            _ => NameConstraints::new(60, Charset::AlnumHyphen)
                .lowercase()
                .starting_with_letter(),
        }
    }
}

/// Google Cloud: lowercase, hyphenated, starting with a letter
#[derive(Debug, Clone, Copy, Default)]
pub struct GcpNaming;

impl NamingScheme for GcpNaming {
    fn provider(&self) -> Provider {
        Provider::Gcp
    }

    fn constraints(&self, kind: ResourceKind) -> NameConstraints {
        match kind {
            ResourceKind::StorageContainer => {
                NameConstraints::new(63, Charset::AlnumHyphen).lowercase().min_len(3)
            }
            // Service account ids
            ResourceKind::Role => NameConstraints::new(30, Charset::AlnumHyphen)
                .lowercase()
                .starting_with_letter()
                .min_len(6),
            _ => NameConstraints::new(63, Charset::AlnumHyphen)
                .lowercase()
                .starting_with_letter(),
        }
    }
}

/// Naming scheme for a provider
pub fn scheme_for(provider: Provider) -> Arc<dyn NamingScheme> {
    match provider {
        Provider::Aws => Arc::new(AwsNaming),
        Provider::Azure => Arc::new(AzureNaming),
        Provider::Gcp => Arc::new(GcpNaming),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KINDS: [ResourceKind; 11] = [
        ResourceKind::ResourceGroup,
        ResourceKind::Role,
        ResourceKind::Function,
        ResourceKind::StorageContainer,
        ResourceKind::Queue,
        ResourceKind::IotRegistry,
        ResourceKind::IotThing,
        ResourceKind::TwinGraph,
        ResourceKind::TwinEntity,
        ResourceKind::Dashboard,
        ResourceKind::DataSource,
    ];

    fn twin_strategy() -> impl Strategy<Value = TwinName> {
        "[a-z][a-z0-9]{0,10}(-[a-z0-9]{1,6}){0,2}".prop_map(|s| TwinName::new(s).unwrap())
    }

    fn device_strategy() -> impl Strategy<Value = DeviceId> {
        "[A-Za-z0-9_-]{1,40}".prop_map(|s| DeviceId::new(s).unwrap())
    }

    fn component_strategy() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("processor"),
            Just("iot-thing"),
            Just("twin-entity"),
            Just("digital-twin-data-connector-last-entry"),
        ]
    }

    #[test]
    fn test_readable_names() {
        let twin = TwinName::new("plant").unwrap();
        assert_eq!(
            AwsNaming.name(&twin, "persister", None, ResourceKind::Function),
            "plant-persister"
        );
        assert_eq!(
            GcpNaming.name(&twin, "hot-storage", None, ResourceKind::StorageContainer),
            "plant-hot-storage"
        );
    }

    #[test]
    fn test_azure_storage_account_fits() {
        let twin = TwinName::new("factory-line-seven").unwrap();
        let name = AzureNaming.name(&twin, "archive-storage", None, ResourceKind::StorageContainer);
        assert!(name.len() <= 24);
        assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_device_spelling_a_digested_name_stays_distinct() {
        let twin = TwinName::new("plant").unwrap();
        let s_1 = DeviceId::new("s_1").unwrap();
        let digested = AzureNaming.name(&twin, "processor", Some(&s_1), ResourceKind::Function);
        let mimic = DeviceId::new(digested.trim_start_matches("plant-processor-")).unwrap();
        assert_ne!(mimic, s_1);

        let named = AzureNaming.name(&twin, "processor", Some(&mimic), ResourceKind::Function);
        assert_ne!(named, digested, "distinct devices collide");
        assert!(AzureNaming.constraints(ResourceKind::Function).accepts(&named));
    }

    proptest! {
        #[test]
        fn prop_names_are_stable_and_conforming(
            twin in twin_strategy(),
            component in component_strategy(),
            device in proptest::option::of(device_strategy()),
        ) {
            for provider in Provider::ALL {
                let scheme = scheme_for(provider);
                for kind in KINDS {
                    let first = scheme.name(&twin, component, device.as_ref(), kind);
                    let second = scheme.name(&twin, component, device.as_ref(), kind);
                    prop_assert_eq!(&first, &second);
                    prop_assert!(scheme.constraints(kind).accepts(&first), "{} rejected for {}", first, kind);
                }
            }
        }

        #[test]
        fn prop_distinct_devices_get_distinct_names(
            twin in twin_strategy(),
            component in component_strategy(),
            a in device_strategy(),
            b in device_strategy(),
        ) {
            prop_assume!(a != b);
            for provider in Provider::ALL {
                let scheme = scheme_for(provider);
                for kind in KINDS {
                    prop_assert_ne!(
                        scheme.name(&twin, component, Some(&a), kind),
                        scheme.name(&twin, component, Some(&b), kind)
                    );
                }
            }
        }
    }
}
