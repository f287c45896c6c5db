//! Deployment areas and initial placement
//!
//! Each side deploys in a strip ten rows deep along its own map edge. The
//! strip's front is centred on the map and split into one equal block per
//! nation on that side.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::battle::battle_map::BattleMap;
use crate::battle::geometry::{Position, Rect};
use crate::battle::occupancy::Occupancy;
use crate::battle::units::Brigade;
use crate::core::types::{NationId, Side};

/// Rows in each side's deployment strip
pub const SETUP_DEPTH: u32 = 10;

/// Front width for a single nation
pub const SINGLE_NATION_FRONT: u32 = 20;

/// Front width for each of two allied nations
pub const PAIRED_NATION_FRONT: u32 = 16;

/// Deployment rectangle of one nation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupArea {
    pub nation: NationId,
    pub side: Side,
    pub rect: Rect,
}

impl SetupArea {
    /// Row facing the enemy
    pub fn front_row(&self) -> i32 {
        match self.side {
            Side::First => self.rect.max_y,
            Side::Second => self.rect.min_y,
        }
    }

    /// Sectors from the front row backwards, each row from the centre outwards
    pub fn deployment_order(&self) -> Vec<Position> {
        let center_x = self.rect.center().x;
        let rows: Vec<i32> = match self.side {
            Side::First => (self.rect.min_y..=self.rect.max_y).rev().collect(),
            Side::Second => (self.rect.min_y..=self.rect.max_y).collect(),
        };

        let mut columns: Vec<i32> = (self.rect.min_x..=self.rect.max_x).collect();
        columns.sort_by_key(|x| ((x - center_x).abs(), *x));

        rows.into_iter()
            .flat_map(|y| columns.iter().map(move |x| Position::new(*x, y)))
            .collect()
    }
}

/// Splits each side's deployment strip between its nations
#[derive(Debug, Clone, Copy)]
pub struct SetupAreaCalculator {
    size_x: u32,
    size_y: u32,
}

impl SetupAreaCalculator {
    pub fn new(size_x: u32, size_y: u32) -> Self {
        Self { size_x, size_y }
    }

    pub fn for_map(map: &BattleMap) -> Self {
        Self::new(map.size_x, map.size_y)
    }

    /// Rows of the side's deployment strip
    pub fn rows(&self, side: Side) -> (i32, i32) {
        let depth = SETUP_DEPTH.min(self.size_y) as i32;
        match side {
            Side::First => (0, depth - 1),
            Side::Second => (self.size_y as i32 - depth, self.size_y as i32 - 1),
        }
    }

    /// Total width of the deployment front for `nations` nations
    pub fn front_width(&self, nations: usize) -> u32 {
        let wanted = match nations {
            0 => 0,
            1 => SINGLE_NATION_FRONT,
            2 => 2 * PAIRED_NATION_FRONT,
            _ => self.size_x,
        };
        wanted.min(self.size_x)
    }

    /// Block widths, the remainder going to the outermost blocks first (left, then right)
    pub fn block_widths(&self, nations: usize) -> Vec<u32> {
        if nations == 0 {
            return Vec::new();
        }
        let total = self.front_width(nations);
        let base = total / nations as u32;
        let mut widths = vec![base; nations];
        let mut remainder = (total - base * nations as u32) as usize;

        let (mut left, mut right) = (0usize, nations - 1);
        while remainder > 0 {
            widths[left] += 1;
            remainder -= 1;
            if remainder > 0 && right != left {
                widths[right] += 1;
                remainder -= 1;
            }
            left += 1;
            right = right.saturating_sub(1);
            if left >= nations {
                left = 0;
                right = nations - 1;
            }
        }
        widths
    }

    /// Deployment areas for the nations of one side, west to east
    pub fn areas(&self, side: Side, nations: &[NationId]) -> Vec<SetupArea> {
        let (min_y, max_y) = self.rows(side);
        let widths = self.block_widths(nations.len());
        let total: u32 = widths.iter().sum();
        let mut x = (self.size_x / 2) as i32 - (total / 2) as i32;

        nations
            .iter()
            .zip(widths)
            .map(|(nation, width)| {
                let rect = Rect::new(x, min_y, x + width as i32 - 1, max_y);
                x += width as i32;
                SetupArea {
                    nation: *nation,
                    side,
                    rect,
                }
            })
            .collect()
    }

    /// Mark every deployment sector with its nation
    pub fn mark(map: &mut BattleMap, areas: &[SetupArea]) {
        for area in areas {
            for pos in area.rect.positions() {
                if let Some(sector) = map.get_mut(pos) {
                    sector.nation = Some(area.nation);
                }
            }
        }
    }
}

/// Place a nation's brigades in its area, front rows first
///
/// Brigades that already have a position keep it. Returns how many brigades
/// could not be placed; those stay off the field.
pub fn place_brigades<'a>(
    map: &BattleMap,
    occupancy: &mut Occupancy,
    area: &SetupArea,
    brigades: impl IntoIterator<Item = &'a mut Brigade>,
) -> usize {
    let mut slots = area
        .deployment_order()
        .into_iter()
        .filter(|p| map.get(*p).is_some_and(|s| s.is_passable()));
    let mut unplaced = 0;

    for brigade in brigades {
        if brigade.nation != area.nation || brigade.position.is_some() || !brigade.is_alive() {
            continue;
        }
        match slots.by_ref().find(|p| occupancy.is_free(*p)) {
            Some(pos) => {
                occupancy.place(brigade.id, pos);
                brigade.position = Some(pos);
                debug!(brigade = brigade.id.0, x = pos.x, y = pos.y, "Deployed brigade");
            }
            None => {
                warn!(brigade = brigade.id.0, nation = area.nation.0, "No deployment slot left");
                unplaced += 1;
            }
        }
    }
    unplaced
}
