//! Layer status reports

use serde::Serialize;
use std::fmt;
use twinforge_types::{MacroLayer, Provider};

/// Presence of one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
    pub component: String,
    /// Deployed resource name
    pub resource: String,
    pub present: bool,
}

/// Ordered component → present map for one layer on one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerInfo {
    pub layer: MacroLayer,
    pub provider: Provider,
    pub components: Vec<ComponentStatus>,
}

impl LayerInfo {
    pub fn new(layer: MacroLayer, provider: Provider) -> Self {
        Self {
            layer,
            provider,
            components: Vec::new(),
        }
    }

    pub fn push(&mut self, component: impl Into<String>, resource: impl Into<String>, present: bool) {
        self.components.push(ComponentStatus {
            component: component.into(),
            resource: resource.into(),
            present,
        });
    }

    /// `None` when the layer has no such component
    pub fn is_present(&self, component: &str) -> Option<bool> {
        self.components
            .iter()
            .find(|c| c.component == component)
            .map(|c| c.present)
    }

    pub fn missing(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|c| !c.present)
            .map(|c| c.component.as_str())
            .collect()
    }

    /// Every component present. Vacuously true for an empty layer.
    pub fn is_complete(&self) -> bool {
        self.components.iter().all(|c| c.present)
    }

    pub fn is_absent(&self) -> bool {
        self.components.iter().all(|c| !c.present)
    }
}

impl fmt::Display for LayerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} on {}", self.layer, self.provider.display_name())?;
        if self.components.is_empty() {
            return writeln!(f, "  (nothing to deploy)");
        }
        for c in &self.components {
            let mark = if c.present { "✓" } else { "✗" };
            writeln!(f, "  {mark} {:<40} {}", display_name(&c.component), c.resource)?;
        }
        Ok(())
    }
}

/// Human-readable component name: `hot-reader-last-entry` → `Hot Reader Last Entry`
pub fn display_name(component: &str) -> String {
    component
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
