//! Battlefield map: an arena of sectors addressed by grid position
//!
//! The map is sized once when the battle is set up and never resized.
//! Sectors live in a flat `Vec` indexed row by row; unit occupancy is kept
//! separately in `battle::occupancy` so the map owns terrain only.

use serde::{Deserialize, Serialize};

use crate::battle::geometry::{Position, Rect};
use crate::battle::terrain::{River, Settlement};
use crate::core::config::MovementConfig;
use crate::core::types::NationId;

/// Lowest altitude tier
pub const BASE_ALTITUDE: u8 = 1;

/// A single sector of the battlefield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub position: Position,
    pub altitude: u8,
    pub forest: bool,
    pub settlement: Option<Settlement>,
    pub chateau: bool,
    /// Remaining strength of a wall standing in this sector
    pub wall: Option<u32>,
    /// Inside a fort's walls
    pub fort: bool,
    pub river: Option<River>,
    pub road: bool,
    /// Permanent bridge over a river, identified by its crossing id
    pub bridge: Option<u32>,
    /// Pontoon bridge built during the battle
    pub pontoon: bool,
    pub entrenchment: bool,
    pub strategic_point: bool,
    /// Nation currently holding this (strategic) sector
    pub current_holder: Option<NationId>,
    /// Nation owning the sector (strategic points, setup areas)
    pub nation: Option<NationId>,
}

impl Sector {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            altitude: BASE_ALTITUDE,
            forest: false,
            settlement: None,
            chateau: false,
            wall: None,
            fort: false,
            river: None,
            road: false,
            bridge: None,
            pontoon: false,
            entrenchment: false,
            strategic_point: false,
            current_holder: None,
            nation: None,
        }
    }

    /// Forest, villages and towns hide whatever stands deep inside them
    pub fn is_opaque(&self) -> bool {
        self.forest || self.settlement.is_some()
    }

    /// Chateaus and walls block sight outright
    pub fn blocks_sight(&self) -> bool {
        self.chateau || self.wall.is_some()
    }

    /// Can a river in this sector be crossed by marching?
    pub fn has_crossing(&self) -> bool {
        self.bridge.is_some() || self.pontoon
    }

    /// Does this sector already carry a placed terrain feature?
    ///
    /// Feature calculators skip such sectors so that features never overlap.
    pub fn has_feature(&self) -> bool {
        self.forest
            || self.settlement.is_some()
            || self.chateau
            || self.wall.is_some()
            || self.fort
            || self.river.is_some()
            || self.road
    }

    /// Can any unit ever stand in this sector?
    pub fn is_passable(&self) -> bool {
        if self.wall.is_some() {
            return false;
        }
        match self.river {
            Some(River::Major) => self.has_crossing(),
            _ => true,
        }
    }

    /// Movement points needed to enter this sector from a sector at `from_altitude`
    ///
    /// Returns `None` when the sector cannot be entered at all.
    pub fn movement_cost(
        &self,
        from_altitude: u8,
        mounted: bool,
        config: &MovementConfig,
    ) -> Option<u32> {
        if !self.is_passable() {
            return None;
        }

        let mut cost = if self.has_crossing() {
            config.bridge_cost
        } else if self.river == Some(River::Minor) {
            config.minor_river_cost
        } else if self.road {
            config.road_cost
        } else if self.chateau {
            config.chateau_cost
        } else if self.forest {
            if mounted {
                config.forest_cost_mounted
            } else {
                config.forest_cost
            }
        } else if self.settlement.is_some() {
            config.settlement_cost
        } else {
            config.open_cost
        };

        if self.altitude > from_altitude && !self.road {
            cost += config.uphill_cost * u32::from(self.altitude - from_altitude);
        }

        Some(cost)
    }
}

/// The full battlefield
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleMap {
    pub size_x: u32,
    pub size_y: u32,
    sectors: Vec<Sector>,
}

impl BattleMap {
    /// Create a flat, featureless map
    pub fn new(size_x: u32, size_y: u32) -> Self {
        let mut sectors = Vec::with_capacity((size_x * size_y) as usize);
        for y in 0..size_y as i32 {
            for x in 0..size_x as i32 {
                sectors.push(Sector::new(Position::new(x, y)));
            }
        }

        Self {
            size_x,
            size_y,
            sectors,
        }
    }

    /// Check if position is within map bounds
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.size_x as i32 && pos.y < self.size_y as i32
    }

    /// Arena index of a position
    pub fn index_of(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.size_x as usize + pos.x as usize)
        } else {
            None
        }
    }

    pub fn get(&self, pos: Position) -> Option<&Sector> {
        self.index_of(pos).map(|i| &self.sectors[i])
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Sector> {
        self.index_of(pos).map(move |i| &mut self.sectors[i])
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn sectors_mut(&mut self) -> &mut [Sector] {
        &mut self.sectors
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Whole map as a rectangle
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.size_x as i32 - 1, self.size_y as i32 - 1)
    }

    /// In-bounds neighbours of a position
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        pos.neighbors().into_iter().filter(move |p| self.in_bounds(*p))
    }

    pub fn altitude(&self, pos: Position) -> u8 {
        self.get(pos).map(|s| s.altitude).unwrap_or(BASE_ALTITUDE)
    }

    pub fn set_altitude(&mut self, pos: Position, altitude: u8) {
        if let Some(sector) = self.get_mut(pos) {
            sector.altitude = altitude;
        }
    }

    pub fn set_forest(&mut self, pos: Position) {
        if let Some(sector) = self.get_mut(pos) {
            sector.forest = true;
        }
    }

    pub fn set_settlement(&mut self, pos: Position, settlement: Settlement) {
        if let Some(sector) = self.get_mut(pos) {
            sector.settlement = Some(settlement);
        }
    }

    pub fn set_wall(&mut self, pos: Position, strength: u32) {
        if let Some(sector) = self.get_mut(pos) {
            sector.wall = Some(strength);
        }
    }

    /// Positions of every strategic point, row by row
    pub fn strategic_points(&self) -> Vec<Position> {
        self.sectors
            .iter()
            .filter(|s| s.strategic_point)
            .map(|s| s.position)
            .collect()
    }

    /// Count sectors matching a predicate
    pub fn count_where(&self, predicate: impl Fn(&Sector) -> bool) -> usize {
        self.sectors.iter().filter(|s| predicate(s)).count()
    }
}
