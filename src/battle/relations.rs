//! Which nations fight on which side
//!
//! Built once by the caller and passed read-only into the battle, so battles
//! stay independent of any process-wide relation tables.

use serde::{Deserialize, Serialize};

use crate::core::error::{BattleError, Result};
use crate::core::types::{NationId, Side};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationRelations {
    sides: [Vec<NationId>; 2],
}

impl NationRelations {
    /// Both sides must be non-empty and no nation may fight on both
    pub fn new(first: Vec<NationId>, second: Vec<NationId>) -> Result<Self> {
        if first.is_empty() {
            return Err(BattleError::EmptySide(0));
        }
        if second.is_empty() {
            return Err(BattleError::EmptySide(1));
        }
        if let Some(nation) = first.iter().find(|n| second.contains(n)) {
            return Err(BattleError::NationOnBothSides(*nation));
        }
        Ok(Self {
            sides: [first, second],
        })
    }

    /// Nations of a side, in setup-area order (west to east)
    pub fn nations(&self, side: Side) -> &[NationId] {
        &self.sides[side.index()]
    }

    pub fn side_of(&self, nation: NationId) -> Option<Side> {
        Side::all()
            .into_iter()
            .find(|side| self.sides[side.index()].contains(&nation))
    }

    pub fn are_allies(&self, a: NationId, b: NationId) -> bool {
        match (self.side_of(a), self.side_of(b)) {
            (Some(sa), Some(sb)) => sa == sb,
            _ => false,
        }
    }

    pub fn are_enemies(&self, a: NationId, b: NationId) -> bool {
        match (self.side_of(a), self.side_of(b)) {
            (Some(sa), Some(sb)) => sa != sb,
            _ => false,
        }
    }
}
