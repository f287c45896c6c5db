//! Sector ↔ brigade index
//!
//! The map arena does not know about units. This index maps each sector to
//! the brigade standing on it; the brigade's own `position` is the reverse
//! direction. At most one brigade may stand on a sector.

use crate::battle::battle_map::BattleMap;
use crate::battle::geometry::Position;
use crate::core::types::BrigadeId;

#[derive(Debug, Clone)]
pub struct Occupancy {
    size_x: u32,
    size_y: u32,
    cells: Vec<Option<BrigadeId>>,
}

impl Occupancy {
    pub fn new(map: &BattleMap) -> Self {
        Self {
            size_x: map.size_x,
            size_y: map.size_y,
            cells: vec![None; map.len()],
        }
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x >= 0 && pos.y >= 0 && pos.x < self.size_x as i32 && pos.y < self.size_y as i32 {
            Some(pos.y as usize * self.size_x as usize + pos.x as usize)
        } else {
            None
        }
    }

    pub fn at(&self, pos: Position) -> Option<BrigadeId> {
        self.index(pos).and_then(|i| self.cells[i])
    }

    pub fn is_free(&self, pos: Position) -> bool {
        self.index(pos).is_some() && self.at(pos).is_none()
    }

    /// Put a brigade on a free sector; returns false if the sector is taken
    pub fn place(&mut self, brigade: BrigadeId, pos: Position) -> bool {
        let Some(i) = self.index(pos) else {
            return false;
        };
        match self.cells[i] {
            None => {
                self.cells[i] = Some(brigade);
                true
            }
            Some(existing) => existing == brigade,
        }
    }

    /// Clear a sector if the given brigade stands on it
    pub fn remove(&mut self, brigade: BrigadeId, pos: Position) {
        if let Some(i) = self.index(pos) {
            if self.cells[i] == Some(brigade) {
                self.cells[i] = None;
            }
        }
    }

    /// Move a brigade between sectors; fails without change if `to` is taken
    pub fn relocate(&mut self, brigade: BrigadeId, from: Position, to: Position) -> bool {
        if from == to {
            return true;
        }
        if !self.is_free(to) {
            return false;
        }
        self.remove(brigade, from);
        self.place(brigade, to)
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}
