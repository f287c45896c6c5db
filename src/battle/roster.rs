//! Battle inputs: the two sides' brigades, commanders and the contested tile
//!
//! Whoever decides that a battle happens supplies a `Roster` through a
//! `RosterProvider`. `Scenario` is the provider used by the runner and the
//! tests: a TOML file describing a whole battle.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battle::geometry::Position;
use crate::battle::orders::Order;
use crate::battle::relations::NationRelations;
use crate::battle::terrain::{ProductionSite, TerrainType};
use crate::battle::units::{Battalion, BattalionType, Brigade, Commander, CommanderTraits};
use crate::core::error::{BattleError, Result};
use crate::core::types::{BattalionId, BrigadeId, CommanderId, NationId, Side};

/// Everything the engine needs to start a battle
#[derive(Debug, Clone)]
pub struct Roster {
    pub relations: NationRelations,
    pub terrain: TerrainType,
    pub site: Option<ProductionSite>,
    /// Side whose half holds the fort, if the site has one
    pub defender: Side,
    pub brigades: Vec<Brigade>,
    pub commanders: Vec<Commander>,
}

impl Roster {
    pub fn total_battalions(&self) -> u32 {
        self.brigades.iter().map(|b| b.battalions.len() as u32).sum()
    }
}

/// Source of battle inputs
pub trait RosterProvider {
    fn roster(&self) -> Result<Roster>;
}

/// Battalion types every scenario can refer to by name
pub fn preset_types() -> Vec<BattalionType> {
    vec![
        BattalionType::line_infantry(),
        BattalionType::light_cavalry(),
        BattalionType::cuirassiers(),
        BattalionType::foot_artillery(),
        BattalionType::sappers(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSides {
    pub first: Vec<NationId>,
    pub second: Vec<NationId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattalionEntry {
    /// Name of a scenario or preset battalion type
    pub kind: String,
    #[serde(default = "one")]
    pub count: u32,
    pub headcount: u32,
    pub experience: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrigadeEntry {
    pub id: BrigadeId,
    #[serde(default)]
    pub name: String,
    pub nation: NationId,
    /// Fixed starting sector; brigades without one are deployed automatically
    #[serde(default)]
    pub position: Option<Position>,
    pub battalions: Vec<BattalionEntry>,
    pub basic_order: Order,
    #[serde(default)]
    pub additional_order: Option<Order>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommanderEntry {
    pub id: CommanderId,
    #[serde(default)]
    pub name: String,
    pub nation: NationId,
    pub strc: u32,
    #[serde(default)]
    pub traits: CommanderTraits,
    #[serde(default)]
    pub brigade: Option<BrigadeId>,
    #[serde(default)]
    pub position: Option<Position>,
}

fn default_defender() -> Side {
    Side::Second
}

/// A whole battle described in TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub terrain: TerrainType,
    #[serde(default)]
    pub site: Option<ProductionSite>,
    #[serde(default = "default_defender")]
    pub defender: Side,
    pub sides: ScenarioSides,
    /// Extra battalion types, looked up before the presets
    #[serde(default)]
    pub battalion_types: Vec<BattalionType>,
    pub brigades: Vec<BrigadeEntry>,
    #[serde(default)]
    pub commanders: Vec<CommanderEntry>,
}

impl Scenario {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Battalion type by name, case-insensitive
    pub fn battalion_type(&self, kind: &str) -> Result<BattalionType> {
        self.battalion_types
            .iter()
            .cloned()
            .chain(preset_types())
            .find(|t| t.name.eq_ignore_ascii_case(kind))
            .ok_or_else(|| BattleError::InvalidConfig(format!("unknown battalion type '{kind}'")))
    }

    fn brigade(&self, entry: &BrigadeEntry, relations: &NationRelations, next_id: &mut u32) -> Result<Brigade> {
        let side = relations
            .side_of(entry.nation)
            .ok_or(BattleError::UnknownNation(entry.nation))?;
        let mut brigade = Brigade::new(entry.id, entry.nation, side, entry.basic_order.clone());
        brigade.name = entry.name.clone();
        brigade.position = entry.position;
        brigade.additional_order = entry.additional_order.clone();

        for battalions in &entry.battalions {
            let battalion_type = self.battalion_type(&battalions.kind)?;
            for _ in 0..battalions.count {
                brigade.battalions.push(Battalion::new(
                    BattalionId(*next_id),
                    battalion_type.clone(),
                    battalions.headcount,
                    battalions.experience,
                ));
                *next_id += 1;
            }
        }
        if brigade.battalions.is_empty() {
            return Err(BattleError::InvalidConfig(format!(
                "brigade {:?} has no battalions",
                entry.id
            )));
        }
        Ok(brigade)
    }
}

impl RosterProvider for Scenario {
    fn roster(&self) -> Result<Roster> {
        let relations = NationRelations::new(self.sides.first.clone(), self.sides.second.clone())?;

        let mut next_id = 1;
        let brigades = self
            .brigades
            .iter()
            .map(|entry| self.brigade(entry, &relations, &mut next_id))
            .collect::<Result<Vec<_>>>()?;
        for side in Side::all() {
            if !brigades.iter().any(|b| b.side == side) {
                return Err(BattleError::EmptySide(side.index()));
            }
        }

        let commanders = self
            .commanders
            .iter()
            .map(|entry| {
                let side = relations
                    .side_of(entry.nation)
                    .ok_or(BattleError::UnknownNation(entry.nation))?;
                let mut commander = Commander::new(entry.id, entry.nation, side, entry.strc);
                commander.name = entry.name.clone();
                commander.traits = entry.traits;
                commander.brigade = entry.brigade;
                commander.position = entry.position;
                Ok(commander)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Roster {
            relations,
            terrain: self.terrain,
            site: self.site,
            defender: self.defender,
            brigades,
            commanders,
        })
    }
}
