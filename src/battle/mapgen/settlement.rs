//! Villages, towns and chateaus
//!
//! Settlements are spread over the four map quadrants in turn so that no
//! corner of the battlefield is left without cover. Each village or town
//! cluster gets its own id.

use tracing::debug;

use crate::battle::battle_map::{BattleMap, Sector};
use crate::battle::geometry::Position;
use crate::battle::mapgen::cluster::{quadrants, ClusterCalculator};
use crate::battle::terrain::Settlement;
use crate::core::random::RandomSource;

pub const MIN_VILLAGE_SIZE: u32 = 2;
pub const MAX_VILLAGE_SIZE: u32 = 5;
pub const MIN_TOWN_SIZE: u32 = 6;
pub const MAX_TOWN_SIZE: u32 = 12;

/// Settlements may stand on roads but on no other feature
fn buildable(sector: &Sector) -> bool {
    !sector.forest
        && sector.settlement.is_none()
        && !sector.chateau
        && sector.wall.is_none()
        && !sector.fort
        && sector.river.is_none()
}

/// A settlement cluster laid on the map
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedSettlement {
    pub settlement: Settlement,
    pub sectors: Vec<Position>,
}

impl PlacedSettlement {
    /// Sector nearest the middle of the cluster
    pub fn center(&self) -> Option<Position> {
        if self.sectors.is_empty() {
            return None;
        }
        let n = self.sectors.len() as i32;
        let cx = self.sectors.iter().map(|p| p.x).sum::<i32>() / n;
        let cy = self.sectors.iter().map(|p| p.y).sum::<i32>() / n;
        let middle = Position::new(cx, cy);
        self.sectors.iter().copied().min_by_key(|p| (p.distance_sq(&middle), *p))
    }
}

/// Place towns first, then villages, rotating through the quadrants
///
/// Ids are handed out from 1 in placement order.
pub fn place_settlements(
    map: &mut BattleMap,
    rng: &mut impl RandomSource,
    towns: u32,
    villages: u32,
) -> Vec<PlacedSettlement> {
    let regions = quadrants(map);
    let mut placed = Vec::new();
    let mut next_id = 1;

    let plan = (0..towns)
        .map(|_| true)
        .chain((0..villages).map(|_| false))
        .collect::<Vec<bool>>();

    for (i, is_town) in plan.into_iter().enumerate() {
        let region = regions[i % regions.len()];
        let (min, max) = if is_town {
            (MIN_TOWN_SIZE, MAX_TOWN_SIZE)
        } else {
            (MIN_VILLAGE_SIZE, MAX_VILLAGE_SIZE)
        };
        let size = rng.range_u32(min, max) as usize;

        let sectors = ClusterCalculator::new(map).grow(rng, size, Some(region), buildable);
        if sectors.is_empty() {
            debug!(quadrant = i % regions.len(), "No room for settlement");
            continue;
        }

        let settlement = if is_town {
            Settlement::Town(next_id)
        } else {
            Settlement::Village(next_id)
        };
        next_id += 1;
        for pos in &sectors {
            map.set_settlement(*pos, settlement);
        }
        placed.push(PlacedSettlement {
            settlement,
            sectors,
        });
    }

    debug!(count = placed.len(), "Placed settlements");
    placed
}

/// Place single-sector chateaus on open ground away from the map edges
pub fn place_chateaus(map: &mut BattleMap, rng: &mut impl RandomSource, count: u32) -> Vec<Position> {
    let mut interior = map.bounds();
    interior.min_x += 2;
    interior.max_x -= 2;
    interior.min_y += 2;
    interior.max_y -= 2;

    let mut chateaus = Vec::new();
    for _ in 0..count {
        let spot = ClusterCalculator::new(map).grow(rng, 1, Some(interior), |s| {
            !s.has_feature()
                && s.position
                    .neighbors()
                    .iter()
                    .all(|n| map.get(*n).map_or(true, |other| !other.chateau))
        });
        if let Some(&pos) = spot.first() {
            if let Some(sector) = map.get_mut(pos) {
                sector.chateau = true;
            }
            chateaus.push(pos);
        }
    }
    chateaus
}
