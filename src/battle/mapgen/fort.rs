//! Fort placement for fortified production sites
//!
//! A fort is a square courtyard ringed by wall sectors. Gates in the middle
//! of the north and south walls let a road corridor run through the fort
//! and on to the map edge behind it.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::battle::battle_map::{BattleMap, Sector};
use crate::battle::geometry::{Position, Rect};
use crate::battle::mapgen::cluster::ClusterCalculator;
use crate::battle::terrain::ProductionSite;
use crate::core::random::RandomSource;
use crate::core::types::Side;

/// Rows kept between the fort and the deployment strip
pub const FORT_SETUP_GAP: i32 = 11;

/// A fort laid on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fort {
    /// Courtyard inside the walls
    pub courtyard: Rect,
    pub walls: Vec<Position>,
    /// Road sectors from the fort to the rear map edge, gates included
    pub corridor: Vec<Position>,
    pub wall_strength: u32,
}

impl Fort {
    pub fn center(&self) -> Position {
        self.courtyard.center()
    }
}

fn clear_ground(sector: &Sector) -> bool {
    !sector.has_feature() && sector.bridge.is_none()
}

/// Build the fort for a fortified site on the defender's half of the map
///
/// Returns `None` for unfortified sites or when no clear ground is found.
pub fn place_fort(
    map: &mut BattleMap,
    rng: &mut impl RandomSource,
    site: ProductionSite,
    defender: Side,
) -> Option<Fort> {
    let inner = site.fort_size()? as i32;
    let outer = inner + 2;
    let size_y = map.size_y as i32;

    // The ring must fit between the middle of the map and the defender's strip
    let region = match defender {
        Side::First => Rect::new(1, FORT_SETUP_GAP, map.size_x as i32 - 2, size_y / 2 - 1),
        Side::Second => Rect::new(1, size_y / 2, map.size_x as i32 - 2, size_y - 1 - FORT_SETUP_GAP),
    };

    let Some(ring) = ClusterCalculator::new(map).random_square(rng, outer as u32, Some(region), clear_ground)
    else {
        warn!(?site, "No room for fort");
        return None;
    };

    let min_x = ring.iter().map(|p| p.x).min()?;
    let min_y = ring.iter().map(|p| p.y).min()?;
    let courtyard = Rect::new(min_x + 1, min_y + 1, min_x + inner, min_y + inner);
    let gate_x = min_x + outer / 2;
    let north_gate = Position::new(gate_x, min_y);
    let south_gate = Position::new(gate_x, min_y + outer - 1);

    let mut walls = Vec::new();
    for pos in ring {
        if courtyard.contains(pos) {
            if let Some(sector) = map.get_mut(pos) {
                sector.fort = true;
            }
        } else if pos != north_gate && pos != south_gate {
            map.set_wall(pos, site.wall_strength());
            walls.push(pos);
        }
    }

    // Corridor through both gates to the rear edge of the defender's half
    let (from_y, to_y) = match defender {
        Side::First => (0, min_y + outer - 1),
        Side::Second => (min_y, size_y - 1),
    };
    let mut corridor = Vec::new();
    for y in from_y..=to_y {
        let pos = Position::new(gate_x, y);
        if let Some(sector) = map.get_mut(pos) {
            if sector.wall.is_none() {
                sector.road = true;
                corridor.push(pos);
            }
        }
    }

    debug!(?site, x = courtyard.min_x, y = courtyard.min_y, walls = walls.len(), "Built fort");
    Some(Fort {
        courtyard,
        walls,
        corridor,
        wall_strength: site.wall_strength(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::SeededRandom;

    #[test]
    fn test_unfortified_site_has_no_fort() {
        let mut map = BattleMap::new(45, 40);
        let mut rng = SeededRandom::new(1);
        assert!(place_fort(&mut map, &mut rng, ProductionSite::Farm, Side::Second).is_none());
        assert_eq!(map.count_where(|s| s.wall.is_some()), 0);
    }

    #[test]
    fn test_fort_walls_ring_courtyard() {
        let mut map = BattleMap::new(45, 40);
        let mut rng = SeededRandom::new(1);
        let fort = place_fort(&mut map, &mut rng, ProductionSite::SmallFort, Side::Second).unwrap();

        assert_eq!(fort.courtyard.width(), 4);
        assert_eq!(map.count_where(|s| s.fort), 16);
        // Ring of a 6x6 block minus two gates
        assert_eq!(fort.walls.len(), 6 * 6 - 16 - 2);
        assert!(fort
            .walls
            .iter()
            .all(|p| map.get(*p).unwrap().wall == Some(ProductionSite::SmallFort.wall_strength())));
    }

    #[test]
    fn test_fort_on_defender_half() {
        let mut map = BattleMap::new(45, 40);
        let mut rng = SeededRandom::new(17);
        let fort = place_fort(&mut map, &mut rng, ProductionSite::HugeFort, Side::First).unwrap();
        assert!(fort.walls.iter().all(|p| p.y < 20 && p.y >= FORT_SETUP_GAP));
    }

    #[test]
    fn test_corridor_reaches_rear_edge() {
        let mut map = BattleMap::new(45, 40);
        let mut rng = SeededRandom::new(5);
        let fort = place_fort(&mut map, &mut rng, ProductionSite::MediumFort, Side::Second).unwrap();
        assert_eq!(fort.corridor.last().map(|p| p.y), Some(39));
        assert!(fort.corridor.iter().all(|p| map.get(*p).unwrap().is_passable()));
        assert!(fort.corridor.contains(&fort.center()));
    }
}
