//! Battle configuration with documented constants
//!
//! All tunable numbers of the field-battle engine live here. The config is
//! passed explicitly to every processor; there is no process-wide instance.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{BattleError, Result};

/// Movement costs and allowances, in movement points
///
/// Open ground costs 2 points per sector so that roads can be cheaper
/// without fractional arithmetic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub infantry_points: u32,
    pub cavalry_points: u32,
    pub artillery_points: u32,
    /// Extra points for brigades marching in column
    pub column_bonus: u32,
    /// A brigade in square never moves more than this many sectors per half-round
    pub square_max_steps: u32,

    pub open_cost: u32,
    pub road_cost: u32,
    pub forest_cost: u32,
    /// Forest cost for cavalry and artillery
    pub forest_cost_mounted: u32,
    pub settlement_cost: u32,
    pub chateau_cost: u32,
    pub minor_river_cost: u32,
    pub bridge_cost: u32,
    /// Added when stepping onto a higher altitude tier
    pub uphill_cost: u32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            infantry_points: 6,
            cavalry_points: 10,
            artillery_points: 4,
            column_bonus: 2,
            square_max_steps: 1,
            open_cost: 2,
            road_cost: 1,
            forest_cost: 4,
            forest_cost_mounted: 6,
            settlement_cost: 3,
            chateau_cost: 4,
            minor_river_cost: 4,
            bridge_cost: 2,
            uphill_cost: 2,
        }
    }
}

/// Ranged and hand-to-hand combat constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Firing range in sectors per arm
    pub infantry_range: u32,
    pub cavalry_range: u32,
    pub artillery_range: u32,

    /// Combat points are divided by these to yield casualties
    pub ranged_divisor: f64,
    pub melee_divisor: f64,
    /// Random spread applied to each exchange: [1 - spread, 1 + spread)
    pub random_spread: f64,

    /// Artillery hit chance at point blank and its loss per sector of distance
    pub artillery_base_hit: f64,
    pub artillery_hit_falloff: f64,
    /// Chance that a missed artillery shot strikes a ricochet sector
    pub ricochet_chance: f64,
    /// Share of the shot's points delivered by a ricochet
    pub ricochet_fraction: f64,

    /// Casualty multipliers by target formation (ranged)
    pub column_target_factor: f64,
    pub skirmish_target_factor: f64,
    pub square_target_factor: f64,
    /// Firing multipliers by shooter formation
    pub column_fire_factor: f64,
    pub square_fire_factor: f64,
    pub skirmish_fire_factor: f64,

    /// Casualty multipliers for a target standing in cover
    pub forest_cover: f64,
    pub settlement_cover: f64,
    pub chateau_cover: f64,
    pub wall_cover: f64,
    pub entrenchment_cover: f64,

    /// Cavalry attacking a square
    pub cavalry_vs_square: f64,
    /// Attacker standing lower than the defender
    pub uphill_attack: f64,

    /// Any influencing commander of the brigade's side
    pub commander_bonus: f64,
    /// Matching commander type (cavalry leader on cavalry, artillery leader on artillery)
    pub specialist_bonus: f64,
    pub fearless_attacker_bonus: f64,
    pub stout_defender_bonus: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            infantry_range: 2,
            cavalry_range: 1,
            artillery_range: 8,
            ranged_divisor: 400.0,
            melee_divisor: 300.0,
            random_spread: 0.2,
            artillery_base_hit: 0.9,
            artillery_hit_falloff: 0.07,
            ricochet_chance: 0.5,
            ricochet_fraction: 0.5,
            column_target_factor: 1.25,
            skirmish_target_factor: 0.75,
            square_target_factor: 1.25,
            column_fire_factor: 0.5,
            square_fire_factor: 0.75,
            skirmish_fire_factor: 0.75,
            forest_cover: 0.7,
            settlement_cover: 0.6,
            chateau_cover: 0.5,
            wall_cover: 0.5,
            entrenchment_cover: 0.6,
            cavalry_vs_square: 0.3,
            uphill_attack: 0.8,
            commander_bonus: 1.1,
            specialist_bonus: 1.2,
            fearless_attacker_bonus: 1.15,
            stout_defender_bonus: 1.15,
        }
    }
}

/// Morale, rout and rally constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoraleConfig {
    pub rout_base: u32,
    pub rout_per_morale: u32,
    pub legendary_bonus: u32,
    /// Base chance (percent) for a routing brigade to rally each half-round
    pub rally_base_chance: i32,
    /// Step applied by each rally modifier (percent)
    pub rally_step: i32,
    /// Radius inside which an enemy prevents the "no enemy near" rally bonus
    pub rally_enemy_radius: u32,
    /// Radius for the crack/elite ally rally bonus
    pub rally_ally_radius: u32,
    /// Radius for the enemy cavalry rally penalty
    pub rally_cavalry_radius: u32,
}

impl Default for MoraleConfig {
    fn default() -> Self {
        Self {
            rout_base: 60,
            rout_per_morale: 5,
            legendary_bonus: 2,
            rally_base_chance: 30,
            rally_step: 10,
            rally_enemy_radius: 10,
            rally_ally_radius: 5,
            rally_cavalry_radius: 10,
        }
    }
}

/// Engineering actions: how many stationary rounds each one takes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineeringConfig {
    pub destroy_bridge_rounds: u32,
    pub build_pontoon_rounds: u32,
    pub dig_entrenchment_rounds: u32,
    /// Wall strength removed per engineer battalion per round
    pub wall_damage_per_engineer: u32,
}

impl Default for EngineeringConfig {
    fn default() -> Self {
        Self {
            destroy_bridge_rounds: 2,
            build_pontoon_rounds: 3,
            dig_entrenchment_rounds: 2,
            wall_damage_per_engineer: 25,
        }
    }
}

/// Configuration for one field battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleConfig {
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub combat: CombatConfig,
    #[serde(default)]
    pub morale: MoraleConfig,
    #[serde(default)]
    pub engineering: EngineeringConfig,
    /// Rounds a runner plays before giving up on a decision
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

fn default_max_rounds() -> u32 {
    40
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            movement: MovementConfig::default(),
            combat: CombatConfig::default(),
            morale: MoraleConfig::default(),
            engineering: EngineeringConfig::default(),
            max_rounds: default_max_rounds(),
        }
    }
}

impl BattleConfig {
    /// Parse a config from TOML; missing fields take their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: BattleConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.movement.open_cost == 0 {
            return Err(BattleError::InvalidConfig(
                "movement.open_cost must be positive".into(),
            ));
        }
        if self.combat.ranged_divisor <= 0.0 || self.combat.melee_divisor <= 0.0 {
            return Err(BattleError::InvalidConfig(
                "combat divisors must be positive".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.combat.random_spread) {
            return Err(BattleError::InvalidConfig(format!(
                "combat.random_spread ({}) must be in [0, 1)",
                self.combat.random_spread
            )));
        }
        if self.max_rounds == 0 {
            return Err(BattleError::InvalidConfig("max_rounds must be positive".into()));
        }
        Ok(())
    }
}
