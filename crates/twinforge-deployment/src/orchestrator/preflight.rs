//! Pre-flight checks
//!
//! Before a layer deploys, every prerequisite is checked against live
//! state and all missing components are reported in one error. Nothing is
//! retried: a missing prerequisite means an earlier layer was never
//! deployed, not that the control plane is slow.

use super::orchestrator_for;
use crate::context::DeploymentContext;
use crate::error::{DeployError, Result};
use crate::info::{display_name, LayerInfo};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, warn};
use twinforge_types::{Boundary, MacroLayer, Provider};

/// A prior layer that must be in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub layer: MacroLayer,
    pub provider: Provider,
    /// Components that must be present; `None` means all of them
    pub components: Option<&'static [&'static str]>,
}

impl Requirement {
    fn all(layer: MacroLayer, provider: Provider) -> Self {
        Self {
            layer,
            provider,
            components: None,
        }
    }

    fn only(layer: MacroLayer, provider: Provider, components: &'static [&'static str]) -> Self {
        Self {
            layer,
            provider,
            components: Some(components),
        }
    }
}

/// Layers `layer` on `provider` depends on. Setup on the deploying
/// provider is required by everything after it.
pub fn requirements(ctx: &DeploymentContext, layer: MacroLayer, provider: Provider) -> Vec<Requirement> {
    let upstream = |dep: MacroLayer| {
        dep.slot()
            .map(|slot| ctx.provider(slot))
            .unwrap_or(provider)
    };

    let mut requirements = match layer {
        MacroLayer::Setup => return Vec::new(),
        MacroLayer::L0 => vec![],
        MacroLayer::L1 => vec![Requirement::all(MacroLayer::L0, provider)],
        MacroLayer::L2 => vec![Requirement::all(MacroLayer::L1, upstream(MacroLayer::L1))],
        MacroLayer::L3Hot => vec![Requirement::only(
            MacroLayer::L2,
            upstream(MacroLayer::L2),
            &["persister"],
        )],
        MacroLayer::L3Cold => vec![Requirement::all(MacroLayer::L3Hot, upstream(MacroLayer::L3Hot))],
        MacroLayer::L3Archive => {
            vec![Requirement::all(MacroLayer::L3Cold, upstream(MacroLayer::L3Cold))]
        }
        MacroLayer::L4 => vec![Requirement::all(MacroLayer::L3Hot, upstream(MacroLayer::L3Hot))],
        MacroLayer::L5 => vec![Requirement::all(MacroLayer::L4, upstream(MacroLayer::L4))],
    };
    requirements.insert(0, Requirement::all(MacroLayer::Setup, provider));
    requirements
}

/// Fail with every missing prerequisite of `layer` on `provider`
#[instrument(skip_all, fields(layer = %layer, provider = %provider))]
pub async fn check(ctx: &DeploymentContext, layer: MacroLayer, provider: Provider) -> Result<()> {
    let mut missing = Vec::new();

    for requirement in requirements(ctx, layer, provider) {
        let info = orchestrator_for(requirement.layer)
            .info(ctx, requirement.provider)
            .await?;
        match requirement.components {
            Some(components) => {
                for component in components {
                    if info.is_present(component) != Some(true) {
                        missing.push(Missing::Component(component.to_string()));
                    }
                }
            }
            None => missing.extend(
                info.missing()
                    .into_iter()
                    .map(|c| Missing::Component(c.to_string())),
            ),
        }
    }

    if let Some(slot) = layer.slot() {
        let inbound = ctx.resolver().inbound_crossed(slot);
        let glue = match inbound.is_empty() {
            true => None,
            false => Some(orchestrator_for(MacroLayer::L0).info(ctx, provider).await?),
        };

        for boundary in inbound {
            if let Some(glue) = &glue {
                missing.extend(missing_glue(ctx, glue, boundary, provider));
            }
            missing.extend(missing_connection(ctx, boundary).await?);
        }
        for boundary in ctx.resolver().outbound_crossed(slot) {
            missing.extend(missing_connection(ctx, boundary).await?);
        }
    }

    if missing.is_empty() {
        debug!("Pre-flight passed");
        return Ok(());
    }

    let missing = render(missing);
    warn!(missing = ?missing, "Pre-flight failed");
    Err(DeployError::Preflight {
        layer,
        provider,
        missing,
    })
}

fn missing_glue(
    ctx: &DeploymentContext,
    glue: &LayerInfo,
    boundary: Boundary,
    provider: Provider,
) -> Vec<Missing> {
    ctx.catalog()
        .get_by_boundary(boundary)
        .into_iter()
        .filter(|d| d.supports(provider))
        .filter(|d| glue.is_present(d.name) != Some(true))
        .map(|d| Missing::Component(d.name.to_string()))
        .collect()
}

async fn missing_connection(ctx: &DeploymentContext, boundary: Boundary) -> Result<Option<Missing>> {
    let resolvable = ctx
        .connections()
        .get(boundary)
        .await?
        .is_some_and(|c| c.is_resolvable());
    Ok((!resolvable).then_some(Missing::Connection(boundary)))
}

/// A missing prerequisite, keyed by what it is rather than how it reads
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Missing {
    Component(String),
    Connection(Boundary),
}

impl Missing {
    fn label(&self) -> String {
        match self {
            Missing::Component(component) => display_name(component),
            Missing::Connection(boundary) => format!("Inter-cloud connection {}", boundary.key()),
        }
    }
}

/// Deduplicate by identity, then render. Components whose display names
/// coincide (`s-1` and `s_1`) keep their id so each stays visible.
fn render(mut missing: Vec<Missing>) -> Vec<String> {
    let mut seen = HashSet::new();
    missing.retain(|m| seen.insert(m.clone()));

    let mut label_counts: HashMap<String, usize> = HashMap::new();
    for m in &missing {
        *label_counts.entry(m.label()).or_default() += 1;
    }

    missing
        .iter()
        .map(|m| {
            let label = m.label();
            match m {
                Missing::Component(component)
                    if label_counts.get(&label).is_some_and(|n| *n > 1) =>
                {
                    format!("{label} ({component})")
                }
                _ => label,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use twinforge_types::{DeviceConfig, DeviceId, ProjectConfig, TwinName};

    #[test]
    fn test_render_keeps_lookalike_components() {
        let rendered = render(vec![
            Missing::Component("persister".into()),
            Missing::Component("iot-thing-s_1".into()),
            Missing::Component("iot-thing-s-1".into()),
            Missing::Component("persister".into()),
            Missing::Connection(Boundary::L1ToL2),
        ]);
        assert_eq!(
            rendered,
            vec![
                "Persister".to_string(),
                "Iot Thing S 1 (iot-thing-s_1)".to_string(),
                "Iot Thing S 1 (iot-thing-s-1)".to_string(),
                "Inter-cloud connection l1_to_l2".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_every_missing_device_is_reported() {
        let config = ProjectConfig::single_provider(TwinName::new("plant").unwrap(), Provider::Aws)
            .with_device(DeviceConfig::new(DeviceId::new("s_1").unwrap()))
            .with_device(DeviceConfig::new(DeviceId::new("s-1").unwrap()));
        let harness = Harness::new(config);
        harness.deploy_before(MacroLayer::L1).await;

        let err = check(&harness.ctx, MacroLayer::L2, Provider::Aws)
            .await
            .unwrap_err();
        let things: Vec<&String> = err
            .missing()
            .iter()
            .filter(|m| m.starts_with("Iot Thing"))
            .collect();
        assert_eq!(things.len(), 2, "{:?}", err.missing());
        assert_ne!(things[0], things[1]);
    }
}
