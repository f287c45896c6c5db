//! Battlefield dimensions from the number of committed battalions
//!
//! The size is a step function over a handful of tiers, never a continuous
//! formula, and is fixed for the whole battle once computed.

use serde::{Deserialize, Serialize};

/// One size tier: battles with fewer than `below` battalions use this size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeTier {
    pub below: u32,
    pub size_x: u32,
    pub size_y: u32,
}

/// Size tiers in ascending order; the last tier has no upper bound
pub const SIZE_TIERS: [SizeTier; 4] = [
    SizeTier {
        below: 400,
        size_x: 45,
        size_y: 40,
    },
    SizeTier {
        below: 600,
        size_x: 50,
        size_y: 45,
    },
    SizeTier {
        below: 800,
        size_x: 60,
        size_y: 50,
    },
    SizeTier {
        below: u32::MAX,
        size_x: 65,
        size_y: 55,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDimensions {
    pub size_x: u32,
    pub size_y: u32,
}

impl MapDimensions {
    /// Dimensions for a battle with `battalions` battalions on both sides
    pub fn for_battalions(battalions: u32) -> Self {
        let tier = SIZE_TIERS
            .iter()
            .find(|tier| battalions < tier.below)
            .unwrap_or(&SIZE_TIERS[SIZE_TIERS.len() - 1]);

        Self {
            size_x: tier.size_x,
            size_y: tier.size_y,
        }
    }
}
