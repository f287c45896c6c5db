//! Hill placement
//!
//! Each hill is a cluster raised one tier above the base, with smaller
//! clusters grown inside it for every further tier up to the terrain's
//! maximum altitude.

use tracing::debug;

use crate::battle::battle_map::{BattleMap, BASE_ALTITUDE};
use crate::battle::mapgen::cluster::ClusterCalculator;
use crate::core::random::RandomSource;

pub const MIN_HILL_SIZE: u32 = 12;
pub const MAX_HILL_SIZE: u32 = 40;

/// Raise `hills` hill clusters on the map, capped at `max_altitude`
pub fn place_hills(map: &mut BattleMap, rng: &mut impl RandomSource, hills: u32, max_altitude: u8) {
    if max_altitude <= BASE_ALTITUDE {
        return;
    }

    for _ in 0..hills {
        let size = rng.range_u32(MIN_HILL_SIZE, MAX_HILL_SIZE) as usize;
        let base = ClusterCalculator::new(map).grow(rng, size, None, |s| s.altitude == BASE_ALTITUDE);
        let Some(&summit) = base.first() else {
            continue;
        };
        for pos in &base {
            map.set_altitude(*pos, BASE_ALTITUDE + 1);
        }

        let mut tier_size = size / 2;
        for level in (BASE_ALTITUDE + 2)..=max_altitude {
            if tier_size < 2 {
                break;
            }
            let below = level - 1;
            let tier = ClusterCalculator::new(map).grow_from(rng, summit, tier_size, None, |s| {
                s.altitude == below
            });
            for pos in &tier {
                map.set_altitude(*pos, level);
            }
            tier_size /= 2;
        }

        debug!(x = summit.x, y = summit.y, size, "Raised hill");
    }
}
