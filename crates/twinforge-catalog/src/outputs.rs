//! Output-key map
//!
//! Infrastructure tooling reports deployed identifiers under flat output
//! keys such as `aws_l2_persister_function_name`. The map translates those
//! keys back to the catalog's logical unit names so that identifiers of
//! already-deployed units can be discovered.

use crate::definition::FunctionDefinition;
use serde::Serialize;
use std::collections::BTreeMap;
use twinforge_types::Provider;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputMap {
    entries: BTreeMap<String, &'static str>,
}

impl OutputMap {
    pub(crate) fn build<'a>(
        provider: Provider,
        definitions: impl Iterator<Item = &'a FunctionDefinition>,
    ) -> Self {
        let entries = definitions
            .map(|d| (output_key(provider, d), d.name))
            .collect();
        Self { entries }
    }

    pub fn logical_key(&self, output_key: &str) -> Option<&'static str> {
        self.entries.get(output_key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `{provider}_{layer}_{unit}_function_name` with `-` folded to `_`
pub fn output_key(provider: Provider, definition: &FunctionDefinition) -> String {
    format!(
        "{}_{}_{}_function_name",
        provider,
        definition.layer.code(),
        definition.name
    )
    .replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FunctionCatalog;
    use twinforge_types::MacroLayer;

    #[test]
    fn test_keys_are_snake_case() {
        let catalog = FunctionCatalog::standard();
        let map = catalog.get_terraform_output_map(Provider::Azure, Some(MacroLayer::L3Hot));
        assert_eq!(
            map.logical_key("azure_l3_hot_hot_reader_last_entry_function_name"),
            Some("hot-reader-last-entry")
        );
        assert!(map.iter().all(|(k, _)| !k.contains('-')));
    }

    #[test]
    fn test_unfiltered_map_covers_provider() {
        let catalog = FunctionCatalog::standard();
        let all = catalog.get_terraform_output_map(Provider::Gcp, None);
        assert_eq!(all.len(), catalog.get_by_provider(Provider::Gcp).len());
    }
}
