//! Map builder: runs the terrain calculators in a fixed order
//!
//! Order matters because later features skip sectors already taken by
//! earlier ones: hills, fort, rivers, roads, settlements, chateaus,
//! forests, strategic points.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::battle::battle_map::BattleMap;
use crate::battle::geometry::Position;
use crate::battle::mapgen::altitude::place_hills;
use crate::battle::mapgen::dimensions::MapDimensions;
use crate::battle::mapgen::forest::place_forests;
use crate::battle::mapgen::fort::{place_fort, Fort};
use crate::battle::mapgen::river::{bridge_major_river, place_river, RiverPlan};
use crate::battle::mapgen::road::place_road;
use crate::battle::mapgen::settlement::{place_chateaus, place_settlements, PlacedSettlement};
use crate::battle::mapgen::strategic::place_strategic_points;
use crate::battle::terrain::{ProductionSite, River, TerrainType};
use crate::core::random::RandomSource;
use crate::core::types::Side;

/// Battalions per extra road
pub const BATTALIONS_PER_ROAD: u32 = 300;

/// What the battlefield is generated from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapRequest {
    pub terrain: TerrainType,
    pub site: Option<ProductionSite>,
    /// Total battalions committed by both sides
    pub battalions: u32,
    /// Side whose half holds the fort, if any
    pub defender: Side,
}

impl MapRequest {
    pub fn new(terrain: TerrainType, battalions: u32) -> Self {
        Self {
            terrain,
            site: None,
            battalions,
            defender: Side::Second,
        }
    }

    pub fn with_site(mut self, site: ProductionSite, defender: Side) -> Self {
        self.site = Some(site);
        self.defender = defender;
        self
    }
}

/// A generated battlefield and the features laid on it
#[derive(Debug, Clone)]
pub struct GeneratedMap {
    pub map: BattleMap,
    pub settlements: Vec<PlacedSettlement>,
    pub chateaus: Vec<Position>,
    pub fort: Option<Fort>,
    pub roads: Vec<Vec<Position>>,
    pub strategic_points: Vec<Position>,
}

/// Builds complete battlefields
#[derive(Debug, Default, Clone, Copy)]
pub struct MapBuilder;

impl MapBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Generate one battlefield
    pub fn build(&self, request: &MapRequest, rng: &mut impl RandomSource) -> GeneratedMap {
        let dims = MapDimensions::for_battalions(request.battalions);
        let profile = request.terrain.profile();
        let mut map = BattleMap::new(dims.size_x, dims.size_y);
        let mut next_bridge_id = 1;

        place_hills(&mut map, rng, profile.hill_clusters, profile.max_altitude);

        let fort = match request.site {
            Some(site) => place_fort(&mut map, rng, site, request.defender),
            None => None,
        };

        for i in 0..profile.river_count {
            let kind = if i == 0 && profile.major_river {
                River::Major
            } else {
                River::Minor
            };
            let plan = RiverPlan {
                kind,
                traversing: i == 0,
            };
            let course = place_river(&mut map, rng, plan, &mut next_bridge_id);
            next_bridge_id = bridge_major_river(&mut map, &course, next_bridge_id);
        }

        let road_count = 1 + request.battalions / BATTALIONS_PER_ROAD;
        let mut roads = Vec::with_capacity(road_count as usize);
        for _ in 0..road_count {
            roads.push(place_road(&mut map, rng, &mut next_bridge_id));
        }

        let settlements = place_settlements(&mut map, rng, profile.towns, profile.villages);
        let chateaus = place_chateaus(&mut map, rng, profile.chateaus);
        place_forests(&mut map, rng, profile.forest_share);

        let mut candidates: Vec<Position> =
            settlements.iter().filter_map(PlacedSettlement::center).collect();
        candidates.extend(chateaus.iter().copied());
        if let Some(fort) = &fort {
            candidates.push(fort.center());
        }
        let strategic_points = place_strategic_points(&mut map, &candidates);

        info!(
            terrain = ?request.terrain,
            size_x = map.size_x,
            size_y = map.size_y,
            settlements = settlements.len(),
            strategic_points = strategic_points.len(),
            "Generated battlefield"
        );

        GeneratedMap {
            map,
            settlements,
            chateaus,
            fort,
            roads,
            strategic_points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::SeededRandom;

    #[test]
    fn test_build_uses_tier_dimensions() {
        let request = MapRequest::new(TerrainType::Plains, 650);
        let generated = MapBuilder::new().build(&request, &mut SeededRandom::new(1));
        assert_eq!((generated.map.size_x, generated.map.size_y), (60, 50));
    }

    #[test]
    fn test_build_is_deterministic() {
        let request = MapRequest::new(TerrainType::Hills, 300);
        let a = MapBuilder::new().build(&request, &mut SeededRandom::new(77));
        let b = MapBuilder::new().build(&request, &mut SeededRandom::new(77));
        assert_eq!(a.map.sectors(), b.map.sectors());
    }

    #[test]
    fn test_fortified_site_gets_fort() {
        let request = MapRequest::new(TerrainType::Plains, 300)
            .with_site(ProductionSite::MediumFort, Side::Second);
        let generated = MapBuilder::new().build(&request, &mut SeededRandom::new(3));
        let fort = generated.fort.expect("fort placed");
        assert!(generated.map.get(fort.center()).unwrap().strategic_point);
    }

    #[test]
    fn test_swamp_has_major_river_with_crossings() {
        let request = MapRequest::new(TerrainType::Swamp, 300);
        let generated = MapBuilder::new().build(&request, &mut SeededRandom::new(10));
        let map = &generated.map;
        assert!(map.count_where(|s| s.river == Some(River::Major)) > 0);
        // Every road sector can be marched over
        for road in &generated.roads {
            assert!(road.iter().all(|p| map.get(*p).unwrap().is_passable()));
        }
    }

    #[test]
    fn test_desert_has_no_forest() {
        let request = MapRequest::new(TerrainType::Desert, 300);
        let generated = MapBuilder::new().build(&request, &mut SeededRandom::new(2));
        assert_eq!(generated.map.count_where(|s| s.forest), 0);
    }
}
