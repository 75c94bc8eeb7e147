//! Twinforge Catalog - What gets deployed where
//!
//! The catalog is the static registry of every deployable unit in the
//! pipeline. Combined with the [`BoundaryResolver`] it answers the central
//! question of a multi-cloud deployment: given a per-layer provider
//! assignment, which units does each provider host?
//!
//! ## Key Principle
//!
//! Membership is static. Nothing here looks at live cloud state; the same
//! configuration always resolves to the same unit set. Glue units are the only
//! assignment-dependent members, and a glue unit for boundary `B` is hosted by
//! provider `P` iff `P` is `B`'s target side and the two sides differ.
//!
//! ```
//! use twinforge_catalog::FunctionCatalog;
//! use twinforge_types::{LayerSlot, ProjectConfig, Provider, TwinName};
//!
//! let config = ProjectConfig::single_provider(TwinName::new("plant").unwrap(), Provider::Aws)
//!     .with_provider(LayerSlot::L2, Provider::Azure);
//!
//! let catalog = FunctionCatalog::standard();
//! let glue = catalog.get_l0_for_config(&config, Provider::Azure).unwrap();
//! assert_eq!(glue, vec!["ingestion"]);
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod boundary;
pub mod catalog;
pub mod definition;
pub mod outputs;

pub use boundary::BoundaryResolver;
pub use catalog::FunctionCatalog;
pub use definition::{DeployableUnit, FunctionDefinition};
pub use outputs::OutputMap;
