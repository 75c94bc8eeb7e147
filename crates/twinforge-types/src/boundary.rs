//! Layer adjacencies
//!
//! Data flows across six adjacencies. When the two sides of one are assigned
//! to different providers the boundary is "crossed" and a glue unit must be
//! hosted on the target side to receive the traffic.

use crate::layer::LayerSlot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered pair of adjacent slots (source → target)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Acquisition forwards device telemetry to processing
    L1ToL2,
    /// Processing persists results into hot storage
    L2ToL3Hot,
    /// Hot tier ages data out to the cold tier
    L3HotToL3Cold,
    /// Cold tier ages data out to the archive tier
    L3ColdToL3Archive,
    /// Twin management reads the hot tier
    L3HotToL4,
    /// Dashboards read the hot tier
    L3HotToL5,
}

impl Boundary {
    pub const ALL: [Boundary; 6] = [
        Boundary::L1ToL2,
        Boundary::L2ToL3Hot,
        Boundary::L3HotToL3Cold,
        Boundary::L3ColdToL3Archive,
        Boundary::L3HotToL4,
        Boundary::L3HotToL5,
    ];

    pub fn source(&self) -> LayerSlot {
        match self {
            Boundary::L1ToL2 => LayerSlot::L1,
            Boundary::L2ToL3Hot => LayerSlot::L2,
            Boundary::L3HotToL3Cold | Boundary::L3HotToL4 | Boundary::L3HotToL5 => {
                LayerSlot::L3Hot
            }
            Boundary::L3ColdToL3Archive => LayerSlot::L3Cold,
        }
    }

    pub fn target(&self) -> LayerSlot {
        match self {
            Boundary::L1ToL2 => LayerSlot::L2,
            Boundary::L2ToL3Hot => LayerSlot::L3Hot,
            Boundary::L3HotToL3Cold => LayerSlot::L3Cold,
            Boundary::L3ColdToL3Archive => LayerSlot::L3Archive,
            Boundary::L3HotToL4 => LayerSlot::L4,
            Boundary::L3HotToL5 => LayerSlot::L5,
        }
    }

    /// Stable key indexing the boundary's inter-cloud connection record
    pub fn key(&self) -> &'static str {
        match self {
            Boundary::L1ToL2 => "l1_to_l2",
            Boundary::L2ToL3Hot => "l2_to_l3_hot",
            Boundary::L3HotToL3Cold => "l3_hot_to_l3_cold",
            Boundary::L3ColdToL3Archive => "l3_cold_to_l3_archive",
            Boundary::L3HotToL4 => "l3_hot_to_l4",
            Boundary::L3HotToL5 => "l3_hot_to_l5",
        }
    }

    pub fn from_key(key: &str) -> Option<Boundary> {
        Boundary::ALL.into_iter().find(|b| b.key() == key)
    }

    /// Boundaries whose target is `slot`
    pub fn inbound(slot: LayerSlot) -> impl Iterator<Item = Boundary> {
        Boundary::ALL.into_iter().filter(move |b| b.target() == slot)
    }

    /// Boundaries whose source is `slot`
    pub fn outbound(slot: LayerSlot) -> impl Iterator<Item = Boundary> {
        Boundary::ALL.into_iter().filter(move |b| b.source() == slot)
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source(), self.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique_and_parse_back() {
        for boundary in Boundary::ALL {
            assert_eq!(Boundary::from_key(boundary.key()), Some(boundary));
        }
    }

    #[test]
    fn test_hot_tier_fans_out() {
        let outbound: Vec<_> = Boundary::outbound(LayerSlot::L3Hot).collect();
        assert_eq!(
            outbound,
            vec![Boundary::L3HotToL3Cold, Boundary::L3HotToL4, Boundary::L3HotToL5]
        );
        assert_eq!(Boundary::inbound(LayerSlot::L1).count(), 0);
    }
}
