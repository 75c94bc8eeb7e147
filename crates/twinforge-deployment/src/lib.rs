//! Twinforge Deployment - Layer orchestration across cloud providers
//!
//! A digital twin is deployed as nine macro-layers (Setup, L0 glue, L1
//! acquisition, L2 processing, three storage tiers, L4 twin management and
//! L5 visualization), each of which may live on a different provider.
//!
//! Key components:
//! - [`DeploymentContext`]: configuration, provider handles, connection store
//!   and executor, threaded explicitly through every call
//! - [`ProviderAdapter`]: the control-plane capabilities of one provider
//! - [`LayerOrchestrator`]: deploy / destroy / info for one macro-layer, with
//!   pre-flight checks against the live control plane
//! - [`DeploymentPipeline`]: every layer in dependency order, torn down in
//!   exact reverse
//! - [`InMemoryControlPlane`]: dry-run backend and test double

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod adapter;
pub mod connections;
pub mod context;
pub mod error;
pub mod info;
pub mod memory;
pub mod orchestrator;
pub mod pipeline;
pub mod settings;

#[cfg(test)]
mod testing;

pub use adapter::{CloudError, ProviderAdapter, ResourceHandle, UnitSpec};
pub use connections::{ConnectionStore, FileConnectionStore, InMemoryConnectionStore};
pub use context::{DeploymentContext, DeploymentContextBuilder, ProviderHandle};
pub use error::{DeployError, Result};
pub use info::{ComponentStatus, LayerInfo};
pub use memory::{InMemoryControlPlane, JournalEntry};
pub use orchestrator::{orchestrator_for, LayerOrchestrator, LayerPlan, Step};
pub use pipeline::{DeploymentPipeline, PipelineEvent};
pub use settings::DeployerSettings;
