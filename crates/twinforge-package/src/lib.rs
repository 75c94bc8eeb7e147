//! Twinforge Package - Function sources to deployable artifacts
//!
//! An *application* is one macro-layer's units on one provider. The packager
//! resolves the application's unit set through the catalog and ships exactly
//! those sources plus shared code, in the shape the provider wants:
//!
//! - **PerUnit** (aws, gcp): one archive per unit
//! - **Multiplexed** (azure): one archive per application with a generated
//!   `dispatch.json` routing to `units/<id>/`
//!
//! Every archive is a gzip-compressed tar carrying a `manifest.json`, so a
//! [`Bundle`] can always be decoded back to the units it contains.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod application;
pub mod bundle;
pub mod error;
pub mod packager;
pub mod scaffold;

pub use application::{ApplicationId, PackagingPolicy};
pub use bundle::{Artifact, Bundle, DispatchTable, Manifest, ManifestUnit};
pub use error::{PackagingError, Result};
pub use packager::ArtifactPackager;
pub use scaffold::scaffold_sources;
