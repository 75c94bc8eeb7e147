//! Twinforge Types - Core types for multi-cloud digital twin deployments
//!
//! A digital twin pipeline is split into five architectural layers, each of
//! which can be assigned to a different cloud provider. This crate holds the
//! vocabulary every other crate speaks:
//!
//! - **Provider**: one of `aws`, `azure`, `gcp`, with alias canonicalisation
//! - **LayerSlot**: a provider-assignable slot (`layer_1` .. `layer_5`, with
//!   `layer_3` split into hot, cold and archive tiers)
//! - **MacroLayer**: the orchestration unit (Setup, L0 glue, L1 .. L5)
//! - **Boundary**: an adjacency between two slots, crossed when their
//!   providers differ
//! - **ProjectConfig**: the per-invocation project description
//! - **InterCloudConnection**: the persisted URL + token enabling one cloud to
//!   call glue hosted on another

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod boundary;
pub mod config;
pub mod connection;
pub mod cost;
pub mod error;
pub mod layer;
pub mod provider;

pub use boundary::Boundary;
pub use config::{DeviceConfig, DeviceId, FeatureFlag, FeatureFlags, ProjectConfig, StorageRetention, TwinName};
pub use connection::{InterCloudConnection, InterCloudRecords};
pub use cost::{ComputeCostEstimator, ComputeFormulaPolicy, ComputePricing, ComputeUsage};
pub use error::{ConfigError, Result};
pub use layer::{LayerSlot, MacroLayer};
pub use provider::Provider;
