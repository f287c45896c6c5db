//! Strategic points
//!
//! Settlement centres, chateaus and fort courtyards are worth holding. Each
//! half of the map gets at least one point so both sides have something to
//! defend.

use tracing::debug;

use crate::battle::battle_map::BattleMap;
use crate::battle::geometry::{Position, Rect};
use crate::core::types::NationId;

/// Flag the given candidates as strategic points, topping up empty halves
///
/// Returns the flagged positions row by row.
pub fn place_strategic_points(map: &mut BattleMap, candidates: &[Position]) -> Vec<Position> {
    for pos in candidates {
        if let Some(sector) = map.get_mut(*pos) {
            if sector.is_passable() {
                sector.strategic_point = true;
            }
        }
    }

    let half = map.size_y as i32 / 2;
    let halves = [
        Rect::new(0, 0, map.size_x as i32 - 1, half - 1),
        Rect::new(0, half, map.size_x as i32 - 1, map.size_y as i32 - 1),
    ];
    for region in halves {
        let covered = region
            .positions()
            .any(|p| map.get(p).is_some_and(|s| s.strategic_point));
        if covered {
            continue;
        }
        // Open ground nearest the middle of the half
        let middle = region.center();
        let fallback = region
            .positions()
            .filter(|p| {
                map.get(*p)
                    .is_some_and(|s| s.is_passable() && s.river.is_none())
            })
            .min_by_key(|p| (p.distance_sq(&middle), *p));
        if let Some(pos) = fallback {
            if let Some(sector) = map.get_mut(pos) {
                sector.strategic_point = true;
            }
        }
    }

    let points = map.strategic_points();
    debug!(count = points.len(), "Placed strategic points");
    points
}

/// Hand every strategic point to the nation with the nearest deployment area
///
/// `areas` pairs each nation with its setup rectangle. The owner also
/// starts as the holder.
pub fn assign_owners(map: &mut BattleMap, areas: &[(NationId, Rect)]) {
    for pos in map.strategic_points() {
        let owner = areas
            .iter()
            .min_by_key(|(nation, area)| (distance_to_rect(pos, area), *nation))
            .map(|(nation, _)| *nation);
        if let Some(sector) = map.get_mut(pos) {
            sector.nation = owner;
            sector.current_holder = owner;
        }
    }
}

fn distance_to_rect(pos: Position, rect: &Rect) -> u32 {
    let clamped = Position::new(
        pos.x.clamp(rect.min_x, rect.max_x),
        pos.y.clamp(rect.min_y, rect.max_y),
    );
    pos.distance(&clamped)
}
