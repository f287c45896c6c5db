//! River placement
//!
//! Rivers run west to east, meandering one row at a time. A traversing river
//! spans the full width of the map; a non-traversing one enters from one
//! edge and dries up part way. Major rivers are three sectors wide and can
//! only be crossed at bridges.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::battle_map::BattleMap;
use crate::battle::geometry::Position;
use crate::battle::terrain::River;
use crate::core::random::RandomSource;

/// Rows kept clear of rivers at the top and bottom (the deployment strips)
pub const RIVER_MARGIN: i32 = 12;

/// Width of a major river
pub const MAJOR_RIVER_WIDTH: i32 = 3;

/// Columns between the guaranteed bridges over a major river
pub const MAJOR_BRIDGE_SPACING: i32 = 15;

/// A river to be laid on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiverPlan {
    pub kind: River,
    /// Runs from edge to edge
    pub traversing: bool,
}

impl RiverPlan {
    pub fn width(&self) -> i32 {
        match self.kind {
            River::Minor => 1,
            River::Major => MAJOR_RIVER_WIDTH,
        }
    }
}

/// Sectors a river was laid on, column by column from west to east
#[derive(Debug, Clone, Default)]
pub struct RiverCourse {
    pub kind: Option<River>,
    pub columns: Vec<Vec<Position>>,
}

impl RiverCourse {
    pub fn sectors(&self) -> impl Iterator<Item = &Position> {
        self.columns.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Lay one river and return its course
///
/// The river bends away from fort walls where it can. Roads already on its
/// course are bridged with ids taken from `next_bridge_id`. Maps too short
/// to keep the deployment strips dry get no river.
pub fn place_river(
    map: &mut BattleMap,
    rng: &mut impl RandomSource,
    plan: RiverPlan,
    next_bridge_id: &mut u32,
) -> RiverCourse {
    let width = plan.width();
    let top = RIVER_MARGIN;
    let bottom = map.size_y as i32 - RIVER_MARGIN - width;
    if bottom < top {
        return RiverCourse::default();
    }

    let size_x = map.size_x as i32;
    let (start_x, end_x) = if plan.traversing {
        (0, size_x - 1)
    } else {
        let length = rng.range_u32(map.size_x / 3, 2 * map.size_x / 3) as i32;
        if rng.chance(0.5) {
            (0, length - 1)
        } else {
            (size_x - length, size_x - 1)
        }
    };

    let mut row = rng.range_u32(top as u32, bottom as u32) as i32;
    let mut course = RiverCourse {
        kind: Some(plan.kind),
        columns: Vec::new(),
    };

    for x in start_x..=end_x {
        let mut column = Vec::with_capacity(width as usize);
        for dy in 0..width {
            let pos = Position::new(x, row + dy);
            if let Some(sector) = map.get_mut(pos) {
                if sector.wall.is_some() || sector.fort {
                    continue;
                }
                sector.river = Some(plan.kind);
                column.push(pos);
            }
        }

        // Meander, keeping the bed inside the margins and clear of walls
        let drift = rng.range_u32(0, 2) as i32 - 1;
        let fits = |next: i32| {
            next >= top
                && next <= bottom
                && (0..width).all(|dy| {
                    map.get(Position::new(x + 1, next + dy))
                        .map_or(true, |s| s.wall.is_none() && !s.fort)
                })
        };
        let next = [drift, 0, -drift, 1, -1]
            .into_iter()
            .map(|d| row + d)
            .find(|next| fits(*next))
            .unwrap_or(row);

        if next != row && width == 1 {
            // Fill the elbow so the river stays orthogonally connected
            let elbow = Position::new(x, next);
            if let Some(sector) = map.get_mut(elbow) {
                if sector.wall.is_none() && !sector.fort {
                    sector.river = Some(plan.kind);
                    column.push(elbow);
                }
            }
        }
        course.columns.push(column);
        row = next;
    }

    bridge_roads(map, &course, next_bridge_id);

    debug!(kind = ?plan.kind, traversing = plan.traversing, sectors = course.len(), "Laid river");
    course
}

/// Bridge every column of the course that carries a road
///
/// Neighbouring road columns share one bridge.
fn bridge_roads(map: &mut BattleMap, course: &RiverCourse, next_bridge_id: &mut u32) {
    let mut previous: Option<u32> = None;
    for column in &course.columns {
        let has_road = column
            .iter()
            .any(|p| map.get(*p).is_some_and(|s| s.road && s.bridge.is_none()));
        if !has_road {
            previous = None;
            continue;
        }
        let id = *previous.get_or_insert_with(|| {
            let id = *next_bridge_id;
            *next_bridge_id += 1;
            id
        });
        bridge_column(map, column, id);
    }
}

/// Put a bridge over every sector of the given river column
pub fn bridge_column(map: &mut BattleMap, column: &[Position], bridge_id: u32) {
    for pos in column {
        if let Some(sector) = map.get_mut(*pos) {
            sector.bridge = Some(bridge_id);
            sector.road = true;
        }
    }
}

/// Bridge a major river at regular intervals so the map is never cut in two
///
/// Returns the next free bridge id.
pub fn bridge_major_river(map: &mut BattleMap, course: &RiverCourse, mut next_id: u32) -> u32 {
    if course.kind != Some(River::Major) {
        return next_id;
    }
    let offset = MAJOR_BRIDGE_SPACING / 2;
    for (i, column) in course.columns.iter().enumerate() {
        if (i as i32) % MAJOR_BRIDGE_SPACING == offset && !column.is_empty() {
            bridge_column(map, column, next_id);
            next_id += 1;
        }
    }
    next_id
}
