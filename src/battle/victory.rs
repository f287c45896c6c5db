//! Victory and pursuit
//!
//! A side wins once the other's morale falls below half its own. The winner's
//! cavalry then rides down the beaten army.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::battle::commander::side_has;
use crate::battle::state::BattleState;
use crate::battle::units::{proportional_share, ArmClass, CommanderType};
use crate::core::random::RandomSource;
use crate::core::types::{BrigadeId, Side};

/// Pursuit multiplier for a side with an active cavalry leader
pub const CAVALRY_LEADER_PURSUIT: f64 = 1.5;

/// Winner, if one side's morale is less than half the other's
///
/// Exactly half is not yet a defeat.
pub fn check_victory(first_morale: u32, second_morale: u32) -> Option<Side> {
    if second_morale * 2 < first_morale {
        Some(Side::First)
    } else if first_morale * 2 < second_morale {
        Some(Side::Second)
    } else {
        None
    }
}

/// Casualties inflicted on one brigade by the pursuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PursuitCasualties {
    pub brigade: BrigadeId,
    pub casualties: u32,
}

/// Pursuit points of the winning side
///
/// Sum over cavalry battalions of standing brigades of
/// experience × headcount × [1, 2) × 2 (light) × 0.5 (cuirassier),
/// then scaled by terrain, by morale / 100 and by 1.5 under a cavalry leader.
pub fn pursuit_points(
    state: &BattleState,
    winner: Side,
    winner_morale: u32,
    rng: &mut dyn RandomSource,
) -> u32 {
    let mut points = 0.0;
    let riders = state
        .brigades
        .iter()
        .filter(|b| b.side == winner && b.is_alive() && !b.is_routing())
        .flat_map(|b| b.living_battalions())
        .filter(|b| b.battalion_type.arm == ArmClass::Cavalry);

    for battalion in riders {
        let mut p = battalion.experience as f64 * battalion.headcount as f64 * rng.range_f64(1.0, 2.0);
        if battalion.battalion_type.light_cavalry {
            p *= 2.0;
        }
        if battalion.battalion_type.cuirassier {
            p *= 0.5;
        }
        points += p;
    }

    points *= state.terrain.pursuit_factor();
    points *= winner_morale as f64 / 100.0;
    if side_has(state, winner, CommanderType::CavalryLeader) {
        points *= CAVALRY_LEADER_PURSUIT;
    }
    points.round() as u32
}

/// Spread pursuit casualties over the loser's battalions by headcount share
pub fn apply_pursuit(state: &mut BattleState, loser: Side, points: u32) -> Vec<PursuitCasualties> {
    let total = state.side_headcount(loser);
    let mut inflicted = Vec::new();

    for i in state.side_indices(loser) {
        let brigade = &mut state.brigades[i];
        if !brigade.is_alive() {
            continue;
        }
        let mut casualties = 0;
        for battalion in brigade.battalions.iter_mut().filter(|b| b.is_alive()) {
            let share = proportional_share(points, battalion.headcount, total);
            casualties += battalion.apply_casualties(share);
        }
        brigade.recent_casualties += casualties;
        inflicted.push(PursuitCasualties {
            brigade: brigade.id,
            casualties,
        });
    }

    let sum: u32 = inflicted.iter().map(|c| c.casualties).sum();
    info!(?loser, points, casualties = sum, "Pursuit");
    inflicted
}
