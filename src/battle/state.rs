//! Battle state: the map, both sides' brigades and commanders
//!
//! Brigades are kept in id order and processed in that order, so a battle
//! replays identically given the same seed. The id index is a hash map used
//! for lookups only, never iterated.

use ahash::AHashMap;
use tracing::{debug, info, warn};

use crate::battle::battle_map::BattleMap;
use crate::battle::geometry::Position;
use crate::battle::mapgen::assign_owners;
use crate::battle::morale::brigade_morale;
use crate::battle::occupancy::Occupancy;
use crate::battle::orders::validate_orders;
use crate::battle::relations::NationRelations;
use crate::battle::setup::{place_brigades, SetupArea, SetupAreaCalculator};
use crate::battle::terrain::TerrainType;
use crate::battle::units::{Brigade, Commander};
use crate::battle::visibility::VisibilityProcessor;
use crate::core::error::{BattleError, Result};
use crate::core::types::{BrigadeId, NationId, Round, Side};

/// Strategic point as seen by the order triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategicPointStatus {
    pub position: Position,
    pub owner: Option<NationId>,
    pub holder: Option<NationId>,
}

/// Everything a field battle mutates round by round
#[derive(Debug, Clone)]
pub struct BattleState {
    pub map: BattleMap,
    pub relations: NationRelations,
    pub terrain: TerrainType,
    pub brigades: Vec<Brigade>,
    pub commanders: Vec<Commander>,
    pub occupancy: Occupancy,
    pub setup_areas: Vec<SetupArea>,
    pub visibility: VisibilityProcessor,
    pub round: Round,
    index: AHashMap<BrigadeId, usize>,
}

impl BattleState {
    /// Assemble a battle, validating orders and nations
    ///
    /// Each brigade's side is taken from the relations. Brigades that
    /// already carry a position are put on the map as given.
    pub fn new(
        map: BattleMap,
        relations: NationRelations,
        terrain: TerrainType,
        mut brigades: Vec<Brigade>,
        mut commanders: Vec<Commander>,
    ) -> Result<Self> {
        brigades.sort_by_key(|b| b.id);
        commanders.sort_by_key(|c| c.id);

        let mut index = AHashMap::new();
        for (i, brigade) in brigades.iter().enumerate() {
            if index.insert(brigade.id, i).is_some() {
                return Err(BattleError::InvalidConfig(format!(
                    "brigade id {} used twice",
                    brigade.id.0
                )));
            }
        }

        for brigade in &mut brigades {
            brigade.side = relations
                .side_of(brigade.nation)
                .ok_or(BattleError::UnknownNation(brigade.nation))?;
            validate_orders(brigade.id, &brigade.basic_order, brigade.additional_order.as_ref())?;

            let orders = std::iter::once(&brigade.basic_order).chain(brigade.additional_order.as_ref());
            for leader in orders.filter_map(|o| o.leader) {
                if !index.contains_key(&leader) {
                    return Err(BattleError::UnknownBrigade(leader));
                }
            }

            brigade.formation = brigade.basic_order.formation;
            brigade.initial_headcount = brigade.headcount();
            brigade.initial_morale = brigade_morale(brigade);
        }

        for commander in &mut commanders {
            commander.side = relations
                .side_of(commander.nation)
                .ok_or(BattleError::UnknownNation(commander.nation))?;
            if let Some(brigade) = commander.brigade {
                if !index.contains_key(&brigade) {
                    return Err(BattleError::UnknownBrigade(brigade));
                }
            }
        }

        let mut occupancy = Occupancy::new(&map);
        for brigade in &brigades {
            let Some(pos) = brigade.position else {
                continue;
            };
            let passable = map.get(pos).is_some_and(|s| s.is_passable());
            if !passable || !occupancy.place(brigade.id, pos) {
                return Err(BattleError::InvalidConfig(format!(
                    "brigade {} cannot stand at ({}, {})",
                    brigade.id.0, pos.x, pos.y
                )));
            }
        }

        Ok(Self {
            map,
            relations,
            terrain,
            brigades,
            commanders,
            occupancy,
            setup_areas: Vec::new(),
            visibility: VisibilityProcessor::new(),
            round: 0,
            index,
        })
    }

    /// Compute setup areas, deploy unplaced brigades and hand out strategic points
    ///
    /// Returns how many brigades found no deployment slot.
    pub fn deploy(&mut self) -> usize {
        let calculator = SetupAreaCalculator::for_map(&self.map);
        let mut areas = Vec::new();
        for side in Side::all() {
            areas.extend(calculator.areas(side, self.relations.nations(side)));
        }
        SetupAreaCalculator::mark(&mut self.map, &areas);

        let mut unplaced = 0;
        for area in &areas {
            unplaced += place_brigades(&self.map, &mut self.occupancy, area, self.brigades.iter_mut());
        }

        let owners: Vec<(NationId, crate::battle::geometry::Rect)> =
            areas.iter().map(|a| (a.nation, a.rect)).collect();
        assign_owners(&mut self.map, &owners);
        self.setup_areas = areas;

        if unplaced > 0 {
            warn!(unplaced, "Some brigades could not be deployed");
        }
        info!(brigades = self.brigades.len(), "Deployed both sides");
        unplaced
    }

    pub fn index_of(&self, id: BrigadeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn brigade(&self, id: BrigadeId) -> Option<&Brigade> {
        self.index_of(id).map(|i| &self.brigades[i])
    }

    pub fn brigade_mut(&mut self, id: BrigadeId) -> Option<&mut Brigade> {
        self.index_of(id).map(move |i| &mut self.brigades[i])
    }

    /// Index of the brigade standing on a sector
    pub fn brigade_at(&self, pos: Position) -> Option<usize> {
        self.occupancy.at(pos).and_then(|id| self.index_of(id))
    }

    /// Indices of a side's brigades in id order
    pub fn side_indices(&self, side: Side) -> Vec<usize> {
        (0..self.brigades.len())
            .filter(|&i| self.brigades[i].side == side)
            .collect()
    }

    /// Living headcount of a side
    pub fn side_headcount(&self, side: Side) -> u32 {
        self.brigades
            .iter()
            .filter(|b| b.side == side)
            .map(|b| b.headcount())
            .sum()
    }

    /// Living, placed brigades of the other side
    pub fn enemies_on_field(&self, side: Side) -> Vec<usize> {
        (0..self.brigades.len())
            .filter(|&i| {
                let b = &self.brigades[i];
                b.side != side && b.position.is_some() && b.is_alive()
            })
            .collect()
    }

    /// Does brigade `i` see position `pos`?
    pub fn sees(&mut self, i: usize, pos: Position) -> bool {
        match self.brigades[i].position {
            Some(from) => self.visibility.visible(&self.map, from, pos),
            None => false,
        }
    }

    /// Nearest enemy of brigade `i`, optionally only among those it can see
    ///
    /// Ties go to the lower brigade id.
    pub fn nearest_enemy(&mut self, i: usize, visible_only: bool) -> Option<usize> {
        let from = self.brigades[i].position?;
        let side = self.brigades[i].side;
        let mut best: Option<(u32, usize)> = None;
        for j in self.enemies_on_field(side) {
            let Some(pos) = self.brigades[j].position else {
                continue;
            };
            if visible_only && !self.visibility.visible(&self.map, from, pos) {
                continue;
            }
            let d = from.distance(&pos);
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, j));
            }
        }
        best.map(|(_, j)| j)
    }

    /// Is any enemy of `side` standing next to `pos`?
    pub fn enemy_adjacent(&self, side: Side, pos: Position) -> bool {
        self.map.neighbors(pos).any(|n| {
            self.brigade_at(n)
                .is_some_and(|j| self.brigades[j].side != side && self.brigades[j].is_alive())
        })
    }

    /// Move brigade `i` to a free sector, keeping the occupancy index in step
    pub fn move_brigade(&mut self, i: usize, to: Position) -> bool {
        let brigade = &mut self.brigades[i];
        let Some(from) = brigade.position else {
            return false;
        };
        if !self.occupancy.relocate(brigade.id, from, to) {
            return false;
        }
        brigade.position = Some(to);
        true
    }

    /// Take a destroyed brigade off the map
    pub fn remove_from_field(&mut self, i: usize) {
        let brigade = &mut self.brigades[i];
        if let Some(pos) = brigade.position.take() {
            self.occupancy.remove(brigade.id, pos);
            brigade.engineering = None;
            debug!(brigade = brigade.id.0, "Brigade left the field");
        }
    }

    /// Where a commander is: with their brigade if attached, else their own position
    pub fn commander_position(&self, commander: &Commander) -> Option<Position> {
        match commander.brigade {
            Some(id) => self.brigade(id).and_then(|b| b.position),
            None => commander.position,
        }
    }

    /// Every strategic point with its owner and holder
    pub fn strategic_points(&self) -> Vec<StrategicPointStatus> {
        self.map
            .sectors()
            .iter()
            .filter(|s| s.strategic_point)
            .map(|s| StrategicPointStatus {
                position: s.position,
                owner: s.nation,
                holder: s.current_holder,
            })
            .collect()
    }

    /// Side a nation fights on
    pub fn side_of(&self, nation: NationId) -> Option<Side> {
        self.relations.side_of(nation)
    }
}
