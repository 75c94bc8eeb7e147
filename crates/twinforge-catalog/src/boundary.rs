//! Boundary detection
//!
//! Providers are canonicalised when the configuration is parsed, so
//! `google` and `gcp` already compare equal by the time they reach the
//! resolver.

use std::collections::BTreeMap;
use twinforge_types::{Boundary, LayerSlot, ProjectConfig, Provider, Result};

/// Resolves which boundaries a provider assignment crosses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryResolver {
    assignments: BTreeMap<LayerSlot, Provider>,
}

impl BoundaryResolver {
    /// Build a resolver; fails when any slot is unassigned.
    pub fn new(config: &ProjectConfig) -> Result<Self> {
        let assignments = LayerSlot::ALL
            .into_iter()
            .map(|slot| config.provider(slot).map(|p| (slot, p)))
            .collect::<Result<_>>()?;
        Ok(Self { assignments })
    }

    pub fn provider(&self, slot: LayerSlot) -> Provider {
        // Every slot is populated by `new`
        self.assignments[&slot]
    }

    pub fn is_crossed(&self, boundary: Boundary) -> bool {
        self.provider(boundary.source()) != self.provider(boundary.target())
    }

    /// Every crossed boundary, in adjacency order
    pub fn crossed(&self) -> Vec<Boundary> {
        Boundary::ALL
            .into_iter()
            .filter(|b| self.is_crossed(*b))
            .collect()
    }

    /// Crossed boundaries whose glue `provider` must host
    pub fn hosted_by(&self, provider: Provider) -> Vec<Boundary> {
        Boundary::ALL
            .into_iter()
            .filter(|b| self.is_crossed(*b) && self.provider(b.target()) == provider)
            .collect()
    }

    /// Crossed boundaries arriving at `slot`
    pub fn inbound_crossed(&self, slot: LayerSlot) -> Vec<Boundary> {
        Boundary::inbound(slot)
            .filter(|b| self.is_crossed(*b))
            .collect()
    }

    /// Crossed boundaries leaving `slot`
    pub fn outbound_crossed(&self, slot: LayerSlot) -> Vec<Boundary> {
        Boundary::outbound(slot)
            .filter(|b| self.is_crossed(*b))
            .collect()
    }
}
