//! Road placement
//!
//! Roads run from the northern edge to the southern edge, linking both
//! deployment strips. Where a road meets a river it crosses on a bridge.

use tracing::debug;

use crate::battle::battle_map::BattleMap;
use crate::battle::geometry::Position;
use crate::core::random::RandomSource;

/// Chance per row that a road wanders sideways when it is not pressed for room
pub const ROAD_WANDER_CHANCE: f64 = 0.3;

/// Lay a road from the top edge to the bottom edge
///
/// Every river crossed gets a bridge; `next_bridge_id` is advanced past the
/// ids handed out. Returns the road sectors from north to south.
pub fn place_road(
    map: &mut BattleMap,
    rng: &mut impl RandomSource,
    next_bridge_id: &mut u32,
) -> Vec<Position> {
    let size_x = map.size_x as i32;
    let size_y = map.size_y as i32;
    let low = map.size_x / 5;
    let high = (4 * map.size_x / 5).max(1) - 1;

    let mut x = rng.range_u32(low, high) as i32;
    let target_x = rng.range_u32(low, high) as i32;
    let mut road = Vec::with_capacity(map.size_y as usize);
    let mut bridge: Option<u32> = None;

    for y in 0..size_y {
        let pos = Position::new(x, y);
        if let Some(sector) = map.get_mut(pos) {
            if sector.wall.is_none() {
                sector.road = true;
                if let Some(existing) = sector.bridge {
                    bridge = Some(existing);
                } else if sector.river.is_some() {
                    let id = *bridge.get_or_insert_with(|| {
                        let id = *next_bridge_id;
                        *next_bridge_id += 1;
                        id
                    });
                    sector.bridge = Some(id);
                } else {
                    bridge = None;
                }
                road.push(pos);
            }
        }

        // Head for the target column, wandering while there is room to spare
        let remaining_rows = size_y - 1 - y;
        let gap = target_x - x;
        let step = if gap.abs() >= remaining_rows {
            gap.signum()
        } else if rng.chance(ROAD_WANDER_CHANCE) {
            if rng.chance(0.5) {
                1
            } else {
                -1
            }
        } else {
            0
        };
        // A wandering road in a river keeps straight so the bridge stays short
        let in_river = bridge.is_some() && gap.abs() < remaining_rows;
        let step = if in_river { 0 } else { step };
        // Skirt around walls
        x = [step, 0, 1, -1]
            .into_iter()
            .map(|d| (x + d).clamp(0, size_x - 1))
            .find(|next| {
                map.get(Position::new(*next, y + 1))
                    .map_or(true, |s| s.wall.is_none())
            })
            .unwrap_or(x);
    }

    debug!(sectors = road.len(), "Laid road");
    road
}
