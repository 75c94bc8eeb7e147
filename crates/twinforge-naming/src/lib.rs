//! Twinforge Naming - Deterministic resource names
//!
//! Every resource name is derived from `(twin, component, device?)` by a pure
//! function. Each provider constrains names differently per resource kind
//! (length, character set, case), so the derivation is split in two:
//!
//! 1. the canonical form `{twin}-{component}[-{device}]`
//! 2. a per-provider [`NameConstraints`] sanitiser
//!
//! When sanitising changes the canonical form in any way (characters dropped
//! or replaced, case folded, truncation) a short digest of the structured
//! input is appended. So is a canonical form that already ends in eight hex
//! characters, since it could otherwise spell out another input's digested
//! name. Every other name is its canonical form, and distinct inputs only
//! share a name on a 32-bit digest collision.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod constraints;
pub mod scheme;

pub use constraints::{Charset, NameConstraints};
pub use scheme::{scheme_for, AwsNaming, AzureNaming, GcpNaming, NamingScheme, ResourceKind};
