//! Terrain of the contested tile and of individual sectors
//!
//! The tile's terrain type decides how the battlefield is generated and how
//! far a beaten army can be pursued across it.

use serde::{Deserialize, Serialize};

/// Terrain type of the tile on which the battle is fought
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TerrainType {
    #[default]
    Plains,
    Hills,
    Forest,
    Mountains,
    Swamp,
    Desert,
}

impl TerrainType {
    /// Multiplier on pursuit points: cavalry chases best across open ground
    pub fn pursuit_factor(&self) -> f64 {
        match self {
            TerrainType::Plains | TerrainType::Desert => 1.0,
            TerrainType::Hills => 0.8,
            TerrainType::Forest | TerrainType::Swamp => 0.6,
            TerrainType::Mountains => 0.5,
        }
    }

    /// Feature densities used by the map builder
    pub fn profile(&self) -> TerrainProfile {
        match self {
            TerrainType::Plains => TerrainProfile {
                hill_clusters: 3,
                max_altitude: 2,
                forest_share: 0.06,
                river_count: 1,
                major_river: false,
                villages: 4,
                towns: 1,
                chateaus: 1,
            },
            TerrainType::Hills => TerrainProfile {
                hill_clusters: 7,
                max_altitude: 3,
                forest_share: 0.08,
                river_count: 1,
                major_river: false,
                villages: 3,
                towns: 1,
                chateaus: 1,
            },
            TerrainType::Forest => TerrainProfile {
                hill_clusters: 3,
                max_altitude: 2,
                forest_share: 0.22,
                river_count: 1,
                major_river: false,
                villages: 3,
                towns: 0,
                chateaus: 1,
            },
            TerrainType::Mountains => TerrainProfile {
                hill_clusters: 10,
                max_altitude: 4,
                forest_share: 0.10,
                river_count: 1,
                major_river: false,
                villages: 2,
                towns: 0,
                chateaus: 0,
            },
            TerrainType::Swamp => TerrainProfile {
                hill_clusters: 1,
                max_altitude: 1,
                forest_share: 0.12,
                river_count: 3,
                major_river: true,
                villages: 2,
                towns: 0,
                chateaus: 0,
            },
            TerrainType::Desert => TerrainProfile {
                hill_clusters: 4,
                max_altitude: 2,
                forest_share: 0.0,
                river_count: 0,
                major_river: false,
                villages: 2,
                towns: 1,
                chateaus: 0,
            },
        }
    }
}

/// Feature densities for one terrain type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainProfile {
    /// Number of hill clusters grown on the map
    pub hill_clusters: u32,
    /// Highest altitude tier (1 = flat)
    pub max_altitude: u8,
    /// Share of the map covered by forest
    pub forest_share: f64,
    pub river_count: u32,
    /// Whether the first river is a three-sector-wide major river
    pub major_river: bool,
    pub villages: u32,
    pub towns: u32,
    pub chateaus: u32,
}

/// Production site on the contested tile that shapes the battlefield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductionSite {
    Barracks,
    SmallFort,
    MediumFort,
    HugeFort,
    Mine,
    Farm,
}

impl ProductionSite {
    /// Inner side length of the fort built for this site, if any
    pub fn fort_size(&self) -> Option<u32> {
        match self {
            ProductionSite::Barracks => Some(3),
            ProductionSite::SmallFort => Some(4),
            ProductionSite::MediumFort => Some(5),
            ProductionSite::HugeFort => Some(7),
            ProductionSite::Mine | ProductionSite::Farm => None,
        }
    }

    /// Strength of each wall sector of the fort
    pub fn wall_strength(&self) -> u32 {
        match self {
            ProductionSite::Barracks => 60,
            ProductionSite::SmallFort => 100,
            ProductionSite::MediumFort => 150,
            ProductionSite::HugeFort => 250,
            ProductionSite::Mine | ProductionSite::Farm => 0,
        }
    }
}

/// A village or town occupying a sector, identified by its cluster id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Settlement {
    Village(u32),
    Town(u32),
}

impl Settlement {
    pub fn id(&self) -> u32 {
        match self {
            Settlement::Village(id) | Settlement::Town(id) => *id,
        }
    }
}

/// River crossing a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum River {
    /// Fordable at extra cost
    Minor,
    /// Impassable without a bridge or pontoon
    Major,
}
