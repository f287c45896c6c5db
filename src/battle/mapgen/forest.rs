//! Forest placement
//!
//! Forests cover a share of the map given by the terrain profile. Most
//! woods are irregular clusters; some are exact square blocks.

use tracing::debug;

use crate::battle::battle_map::{BattleMap, Sector};
use crate::battle::mapgen::cluster::ClusterCalculator;
use crate::core::random::RandomSource;

pub const MIN_WOOD_SIZE: u32 = 4;
pub const MAX_WOOD_SIZE: u32 = 20;

/// Chance that a wood is laid out as a square block
pub const SQUARE_WOOD_CHANCE: f64 = 0.25;

/// Give up after this many woods fail to grow in a row
const MAX_FAILED_WOODS: u32 = 10;

fn free_ground(sector: &Sector) -> bool {
    !sector.has_feature() && !sector.strategic_point
}

/// Plant woods until `share` of the map is forest
///
/// Returns the number of forest sectors on the map afterwards.
pub fn place_forests(map: &mut BattleMap, rng: &mut impl RandomSource, share: f64) -> usize {
    let target = (map.len() as f64 * share.clamp(0.0, 1.0)).round() as usize;
    let mut planted = map.count_where(|s| s.forest);
    let mut failures = 0;

    while planted < target && failures < MAX_FAILED_WOODS {
        let wood = if rng.chance(SQUARE_WOOD_CHANCE) {
            let side = rng.range_u32(2, 3);
            ClusterCalculator::new(map)
                .random_square(rng, side, None, free_ground)
                .unwrap_or_default()
        } else {
            let wanted = rng.range_u32(MIN_WOOD_SIZE, MAX_WOOD_SIZE) as usize;
            let wanted = wanted.min(target - planted).max(1);
            ClusterCalculator::new(map).grow(rng, wanted, None, free_ground)
        };

        if wood.is_empty() {
            failures += 1;
            continue;
        }
        failures = 0;
        for pos in &wood {
            map.set_forest(*pos);
        }
        planted += wood.len();
    }

    debug!(planted, target, "Placed forests");
    planted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::SeededRandom;

    #[test]
    fn test_forest_share_reached() {
        let mut map = BattleMap::new(45, 40);
        let mut rng = SeededRandom::new(12);
        let planted = place_forests(&mut map, &mut rng, 0.1);
        let target = (45.0 * 40.0 * 0.1_f64).round() as usize;
        assert!(planted >= target);
        assert_eq!(planted, map.count_where(|s| s.forest));
    }

    #[test]
    fn test_no_forest_for_zero_share() {
        let mut map = BattleMap::new(20, 20);
        let mut rng = SeededRandom::new(12);
        assert_eq!(place_forests(&mut map, &mut rng, 0.0), 0);
    }

    #[test]
    fn test_forests_avoid_other_features() {
        let mut map = BattleMap::new(20, 20);
        for sector in map.sectors_mut().iter_mut().filter(|s| s.position.x < 10) {
            sector.road = true;
        }
        let mut rng = SeededRandom::new(3);
        place_forests(&mut map, &mut rng, 0.2);
        assert_eq!(map.count_where(|s| s.forest && s.road), 0);
    }
}
