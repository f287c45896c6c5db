//! Long-range fire and artillery ricochet
//!
//! Each standing brigade fires at the nearest enemy it can see. Only the
//! battalions whose arm reaches that far take part. Artillery must hit; a
//! missed shot may still strike whatever stands just beyond the target.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::battle_map::Sector;
use crate::battle::commander::combat_multiplier;
use crate::battle::geometry::Position;
use crate::battle::state::BattleState;
use crate::battle::units::{ArmClass, Brigade, Formation};
use crate::core::config::CombatConfig;
use crate::core::random::RandomSource;
use crate::core::types::{BrigadeId, Side};

/// One brigade's fire in a half-round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireExchange {
    pub shooter: BrigadeId,
    pub target: BrigadeId,
    pub distance: u32,
    pub points: f64,
    pub casualties: u32,
    /// Artillery that missed the target and struck a sector beyond it
    pub ricochet: Option<RicochetHit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RicochetHit {
    pub brigade: BrigadeId,
    pub position: Position,
    pub casualties: u32,
}

/// Firing range of an arm, in sectors
pub fn firing_range(arm: ArmClass, config: &CombatConfig) -> u32 {
    match arm {
        ArmClass::Infantry => config.infantry_range,
        ArmClass::Cavalry => config.cavalry_range,
        ArmClass::Artillery => config.artillery_range,
    }
}

/// Longest range among a brigade's living battalions
pub fn brigade_range(brigade: &Brigade, config: &CombatConfig) -> u32 {
    brigade
        .living_battalions()
        .map(|b| firing_range(b.battalion_type.arm, config))
        .max()
        .unwrap_or(0)
}

/// Raw fire points at `distance`: (musketry, artillery)
///
/// headcount × experience × long-range rating / divisor, over every living
/// battalion within range.
pub fn fire_points(brigade: &Brigade, distance: u32, config: &CombatConfig) -> (f64, f64) {
    let mut musketry = 0.0;
    let mut artillery = 0.0;
    for battalion in brigade.living_battalions() {
        let kind = &battalion.battalion_type;
        if firing_range(kind.arm, config) < distance {
            continue;
        }
        let points =
            battalion.headcount as f64 * battalion.experience as f64 * kind.long_range as f64 / config.ranged_divisor;
        match kind.arm {
            ArmClass::Artillery => artillery += points,
            _ => musketry += points,
        }
    }
    (musketry, artillery)
}

/// Multiplier on fire delivered by a brigade in the given formation
pub fn fire_factor(formation: Formation, config: &CombatConfig) -> f64 {
    match formation {
        Formation::Line => 1.0,
        Formation::Column => config.column_fire_factor,
        Formation::Square => config.square_fire_factor,
        Formation::Skirmish => config.skirmish_fire_factor,
    }
}

/// Multiplier on fire received by a brigade in the given formation
pub fn target_factor(formation: Formation, config: &CombatConfig) -> f64 {
    match formation {
        Formation::Line => 1.0,
        Formation::Column => config.column_target_factor,
        Formation::Square => config.square_target_factor,
        Formation::Skirmish => config.skirmish_target_factor,
    }
}

/// Best cover the sector offers against fire
pub fn cover_factor(sector: &Sector, config: &CombatConfig) -> f64 {
    let mut factor: f64 = 1.0;
    if sector.forest {
        factor = factor.min(config.forest_cover);
    }
    if sector.settlement.is_some() {
        factor = factor.min(config.settlement_cover);
    }
    if sector.chateau {
        factor = factor.min(config.chateau_cover);
    }
    if sector.fort {
        factor = factor.min(config.wall_cover);
    }
    if sector.entrenchment {
        factor = factor.min(config.entrenchment_cover);
    }
    factor
}

/// Chance that artillery hits a target `distance` sectors away
pub fn artillery_hit_chance(distance: u32, config: &CombatConfig) -> f64 {
    (config.artillery_base_hit - config.artillery_hit_falloff * distance as f64).clamp(0.0, 1.0)
}

/// Sectors just beyond `target` on the line of fire from `attacker`
///
/// The line is extended by one step of its longer axis. Where the shorter
/// axis lands between two sectors both are returned. Sectors off the map
/// are dropped.
pub fn ricochet_sectors(attacker: Position, target: Position, size_x: u32, size_y: u32) -> Vec<Position> {
    let dx = target.x - attacker.x;
    let dy = target.y - attacker.y;
    let steps = dx.abs().max(dy.abs());
    if steps == 0 {
        return Vec::new();
    }

    // Beyond-point coordinate along one axis: (target × steps + delta) / steps
    let axis = |t: i32, d: i32| -> Vec<i32> {
        let numerator = t * steps + d;
        let floor = numerator.div_euclid(steps);
        if numerator.rem_euclid(steps) == 0 {
            vec![floor]
        } else {
            vec![floor, floor + 1]
        }
    };

    let mut sectors = Vec::new();
    for y in axis(target.y, dy) {
        for x in axis(target.x, dx) {
            if x >= 0 && y >= 0 && x < size_x as i32 && y < size_y as i32 {
                sectors.push(Position::new(x, y));
            }
        }
    }
    sectors
}

/// Take casualties on brigade `j`, removing it from the field if destroyed
pub(crate) fn inflict(state: &mut BattleState, j: usize, casualties: u32) -> u32 {
    let taken = state.brigades[j].apply_casualties(casualties);
    if !state.brigades[j].is_alive() {
        state.remove_from_field(j);
    }
    taken
}

/// Casualties `points` of fire cause on brigade `j` after formation and cover
fn fire_casualties(state: &BattleState, j: usize, points: f64, config: &CombatConfig) -> u32 {
    let target = &state.brigades[j];
    let cover = target
        .position
        .and_then(|p| state.map.get(p))
        .map_or(1.0, |s| cover_factor(s, config));
    (points * target_factor(target.formation, config) * cover).round() as u32
}

/// Fire of every standing brigade of `side`
pub fn process_fire(
    state: &mut BattleState,
    side: Side,
    config: &CombatConfig,
    rng: &mut dyn RandomSource,
) -> Vec<FireExchange> {
    let mut exchanges = Vec::new();

    for i in state.side_indices(side) {
        if !state.brigades[i].can_fight() {
            continue;
        }
        let Some(j) = state.nearest_enemy(i, true) else {
            continue;
        };
        let (Some(from), Some(at)) = (state.brigades[i].position, state.brigades[j].position) else {
            continue;
        };
        let distance = from.distance(&at);
        if distance > brigade_range(&state.brigades[i], config) {
            continue;
        }

        let (musketry, artillery) = fire_points(&state.brigades[i], distance, config);
        let scale = rng.range_f64(1.0 - config.random_spread, 1.0 + config.random_spread)
            * fire_factor(state.brigades[i].formation, config)
            * combat_multiplier(state, i, true, config);

        let mut points = musketry * scale;
        let mut ricochet = None;
        if artillery > 0.0 {
            if rng.chance(artillery_hit_chance(distance, config)) {
                points += artillery * scale;
            } else if rng.chance(config.ricochet_chance) {
                ricochet = ricochet_strike(state, i, from, at, artillery * scale * config.ricochet_fraction, config);
            }
        }

        let target = state.brigades[j].id;
        let casualties = fire_casualties(state, j, points, config);
        let casualties = inflict(state, j, casualties);
        debug!(
            shooter = state.brigades[i].id.0,
            target = target.0,
            distance,
            points,
            casualties,
            "Fire"
        );
        exchanges.push(FireExchange {
            shooter: state.brigades[i].id,
            target,
            distance,
            points,
            casualties,
            ricochet,
        });
    }
    exchanges
}

/// Strike the first enemy brigade standing in a ricochet sector
fn ricochet_strike(
    state: &mut BattleState,
    shooter: usize,
    from: Position,
    at: Position,
    points: f64,
    config: &CombatConfig,
) -> Option<RicochetHit> {
    let side = state.brigades[shooter].side;
    let sectors = ricochet_sectors(from, at, state.map.size_x, state.map.size_y);
    let (position, j) = sectors.into_iter().find_map(|p| {
        state
            .brigade_at(p)
            .filter(|&j| state.brigades[j].side != side)
            .map(|j| (p, j))
    })?;

    let casualties = fire_casualties(state, j, points, config);
    let casualties = inflict(state, j, casualties);
    Some(RicochetHit {
        brigade: state.brigades[j].id,
        position,
        casualties,
    })
}
