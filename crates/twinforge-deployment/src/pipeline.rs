//! Deployment Pipeline - Whole-twin deploy, destroy and status
//!
//! Runs the layer orchestrators in dependency order, one layer at a time.
//! Each layer's own pre-flight check guards it against an incomplete
//! predecessor, so the pipeline itself keeps no state.

use crate::context::DeploymentContext;
use crate::error::{DeployError, Result};
use crate::info::LayerInfo;
use crate::orchestrator::orchestrator_for;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};
use twinforge_types::{MacroLayer, Provider};

/// Progress notifications, one per layer and provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    LayerDeployed { layer: MacroLayer, provider: Provider },
    LayerDestroyed { layer: MacroLayer, provider: Provider },
    LayerFailed {
        layer: MacroLayer,
        provider: Provider,
        error: String,
    },
}

/// Runs every orchestrator for one context
pub struct DeploymentPipeline<'a> {
    ctx: &'a DeploymentContext,
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl<'a> DeploymentPipeline<'a> {
    pub fn new(ctx: &'a DeploymentContext) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self { ctx, event_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    /// `(layer, provider)` pairs in deploy order
    pub fn deploy_order(&self) -> Vec<(MacroLayer, Provider)> {
        MacroLayer::DEPLOY_ORDER
            .into_iter()
            .flat_map(|layer| {
                self.ctx
                    .targets(layer)
                    .into_iter()
                    .map(move |provider| (layer, provider))
            })
            .collect()
    }

    /// Exact reverse of [`deploy_order`](Self::deploy_order)
    pub fn destroy_order(&self) -> Vec<(MacroLayer, Provider)> {
        let mut order = self.deploy_order();
        order.reverse();
        order
    }

    /// Deploy every layer, stopping at the first failure
    #[instrument(skip(self), fields(twin = %self.ctx.config().twin_name))]
    pub async fn deploy_all(&self) -> Result<()> {
        for (layer, provider) in self.deploy_order() {
            if let Err(e) = orchestrator_for(layer).deploy(self.ctx, provider).await {
                self.emit(PipelineEvent::LayerFailed {
                    layer,
                    provider,
                    error: e.to_string(),
                });
                return Err(e);
            }
            self.emit(PipelineEvent::LayerDeployed { layer, provider });
        }
        info!("Twin deployed");
        Ok(())
    }

    /// Destroy every layer in reverse order. Failures do not stop the
    /// teardown; they are returned together once every layer was tried.
    #[instrument(skip(self), fields(twin = %self.ctx.config().twin_name))]
    pub async fn destroy_all(&self) -> Result<()> {
        let mut failures = Vec::new();
        for (layer, provider) in self.destroy_order() {
            match orchestrator_for(layer).destroy(self.ctx, provider).await {
                Ok(()) => self.emit(PipelineEvent::LayerDestroyed { layer, provider }),
                Err(e) => {
                    warn!(layer = %layer, provider = %provider, error = %e, "Layer teardown incomplete");
                    self.emit(PipelineEvent::LayerFailed {
                        layer,
                        provider,
                        error: e.to_string(),
                    });
                    failures.push(e);
                }
            }
        }

        if failures.is_empty() {
            info!("Twin destroyed");
            Ok(())
        } else {
            Err(DeployError::Incomplete(failures))
        }
    }

    /// Status of every layer, in deploy order
    pub async fn info_all(&self) -> Result<Vec<LayerInfo>> {
        let mut infos = Vec::new();
        for (layer, provider) in self.deploy_order() {
            infos.push(orchestrator_for(layer).info(self.ctx, provider).await?);
        }
        Ok(infos)
    }

    fn emit(&self, event: PipelineEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
