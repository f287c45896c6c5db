//! Commander influence
//!
//! A commander influences every brigade of their side within a radius that
//! grows with their command rating. Influence multiplies combat points; the
//! commander's type flags add specialist bonuses on top.

use tracing::info;

use crate::battle::geometry::Position;
use crate::battle::state::BattleState;
use crate::battle::units::{ArmType, Commander, CommanderType};
use crate::core::config::CombatConfig;
use crate::core::types::{CommanderId, Side};

/// Radius of a commander with no command rating
pub const BASE_INFLUENCE_RADIUS: u32 = 3;

/// Command rating per extra sector of radius
pub const STRC_PER_SECTOR: u32 = 20;

/// Influence radius: 3 + ceil(strc / 20)
pub fn influence_radius(strc: u32) -> u32 {
    BASE_INFLUENCE_RADIUS + (strc + STRC_PER_SECTOR - 1) / STRC_PER_SECTOR
}

/// Active commanders of `side` whose influence reaches `pos`
pub fn influencing<'a>(
    state: &'a BattleState,
    side: Side,
    pos: Position,
) -> impl Iterator<Item = &'a Commander> + 'a {
    state.commanders.iter().filter(move |c| {
        c.side == side
            && c.is_active()
            && state
                .commander_position(c)
                .is_some_and(|at| at.distance(&pos) <= influence_radius(c.strc))
    })
}

/// Is brigade `i` within reach of any active commander of its side?
pub fn is_influenced(state: &BattleState, i: usize) -> bool {
    let brigade = &state.brigades[i];
    brigade
        .position
        .is_some_and(|pos| influencing(state, brigade.side, pos).next().is_some())
}

/// Is brigade `i` within reach of an active commander of the given type?
pub fn is_influenced_by(state: &BattleState, i: usize, commander_type: CommanderType) -> bool {
    let brigade = &state.brigades[i];
    brigade.position.is_some_and(|pos| {
        influencing(state, brigade.side, pos).any(|c| c.traits.has(commander_type))
    })
}

/// Does the side have an active commander of the given type anywhere on the field?
pub fn side_has(state: &BattleState, side: Side, commander_type: CommanderType) -> bool {
    state
        .commanders
        .iter()
        .any(|c| c.side == side && c.is_active() && c.traits.has(commander_type))
}

/// Multiplier on brigade `i`'s combat points from commanders in reach
pub fn combat_multiplier(state: &BattleState, i: usize, attacking: bool, config: &CombatConfig) -> f64 {
    if !is_influenced(state, i) {
        return 1.0;
    }

    let mut multiplier = config.commander_bonus;
    let specialist = match state.brigades[i].arm_type() {
        ArmType::Cavalry => Some(CommanderType::CavalryLeader),
        ArmType::Artillery => Some(CommanderType::ArtilleryLeader),
        ArmType::Infantry => None,
    };
    if specialist.is_some_and(|t| is_influenced_by(state, i, t)) {
        multiplier *= config.specialist_bonus;
    }

    if attacking && is_influenced_by(state, i, CommanderType::FearlessAttacker) {
        multiplier *= config.fearless_attacker_bonus;
    }
    if !attacking && is_influenced_by(state, i, CommanderType::StoutDefender) {
        multiplier *= config.stout_defender_bonus;
    }
    multiplier
}

/// Commanders riding with a destroyed brigade are taken prisoner
pub fn capture_commanders(state: &mut BattleState) -> Vec<CommanderId> {
    let mut captured = Vec::new();
    for i in 0..state.commanders.len() {
        let commander = &state.commanders[i];
        if !commander.is_active() {
            continue;
        }
        let Some(brigade) = commander.brigade else {
            continue;
        };
        let lost = state.brigade(brigade).map_or(true, |b| !b.is_alive());
        if lost {
            let commander = &mut state.commanders[i];
            commander.captured = true;
            info!(commander = commander.id.0, brigade = brigade.0, "Commander captured");
            captured.push(commander.id);
        }
    }
    captured
}
