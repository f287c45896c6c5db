//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Battle round counter (one round = both sides' half-rounds)
pub type Round = u32;

/// Unique identifier for nations taking part in a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NationId(pub u32);

/// Unique identifier for brigades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BrigadeId(pub u32);

/// Unique identifier for battalions inside a brigade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BattalionId(pub u32);

/// Unique identifier for commanders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommanderId(pub u32);

/// One of the two opposing sides of a field battle.
///
/// The first side deploys along the top rows of the map, the second along the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn index(&self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Side::First),
            1 => Some(Side::Second),
            _ => None,
        }
    }

    pub fn opponent(&self) -> Self {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }

    /// Sides in half-round processing order
    pub fn all() -> [Side; 2] {
        [Side::First, Side::Second]
    }

    /// Direction of advance along the y axis
    pub fn forward(&self) -> i32 {
        match self {
            Side::First => 1,
            Side::Second => -1,
        }
    }
}
