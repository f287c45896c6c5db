//! Hand-to-hand combat between adjacent brigades
//!
//! Brigades under an assaulting order attack an adjacent enemy; so do
//! brigades whose march ran into an enemy while moving through. Both sides
//! strike at once, except that a routing defender does not strike back.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::commander::combat_multiplier;
use crate::battle::orders::OrderType;
use crate::battle::ranged::inflict;
use crate::battle::state::BattleState;
use crate::battle::units::{Brigade, Formation};
use crate::core::config::CombatConfig;
use crate::core::random::RandomSource;
use crate::core::types::{BrigadeId, Side};

/// One hand-to-hand fight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeleeExchange {
    pub attacker: BrigadeId,
    pub defender: BrigadeId,
    pub attacker_points: f64,
    pub defender_points: f64,
    pub attacker_casualties: u32,
    pub defender_casualties: u32,
}

/// Orders under which a brigade seeks out adjacent enemies
pub fn seeks_melee(order_type: OrderType) -> bool {
    matches!(
        order_type,
        OrderType::Engage | OrderType::AttackEnemyStrategicPoints | OrderType::RecoverOwnStrategicPoints
    )
}

/// headcount × experience × hand-combat rating / divisor over living battalions
pub fn melee_points(brigade: &Brigade, config: &CombatConfig) -> f64 {
    brigade
        .living_battalions()
        .map(|b| b.headcount as f64 * b.experience as f64 * b.battalion_type.hand_combat as f64)
        .sum::<f64>()
        / config.melee_divisor
}

/// Lowest-id standing enemy next to brigade `i`
pub fn adjacent_enemy(state: &BattleState, i: usize) -> Option<usize> {
    let brigade = &state.brigades[i];
    let pos = brigade.position?;
    state
        .map
        .neighbors(pos)
        .filter_map(|n| state.brigade_at(n))
        .filter(|&j| state.brigades[j].side != brigade.side && state.brigades[j].is_alive())
        .min()
}

/// Resolve one fight between attacker `i` and defender `j`
pub fn resolve_melee(
    state: &mut BattleState,
    i: usize,
    j: usize,
    config: &CombatConfig,
    rng: &mut dyn RandomSource,
) -> MeleeExchange {
    let attacker = &state.brigades[i];
    let defender = &state.brigades[j];
    debug_assert!(attacker.is_alive() && defender.is_alive(), "empty brigade in melee");

    let mut attack = melee_points(attacker, config)
        * rng.range_f64(1.0 - config.random_spread, 1.0 + config.random_spread)
        * combat_multiplier(state, i, true, config);
    if let (Some(a), Some(d)) = (attacker.position, defender.position) {
        if state.map.altitude(a) < state.map.altitude(d) {
            attack *= config.uphill_attack;
        }
    }
    if attacker.is_cavalry() && defender.formation == Formation::Square {
        attack *= config.cavalry_vs_square;
    }

    let defence = if defender.is_routing() {
        0.0
    } else {
        melee_points(defender, config)
            * rng.range_f64(1.0 - config.random_spread, 1.0 + config.random_spread)
            * combat_multiplier(state, j, false, config)
    };

    let (attacker_id, defender_id) = (attacker.id, defender.id);
    let defender_casualties = inflict(state, j, attack.round() as u32);
    let attacker_casualties = inflict(state, i, defence.round() as u32);
    debug!(
        attacker = attacker_id.0,
        defender = defender_id.0,
        attack,
        defence,
        attacker_casualties,
        defender_casualties,
        "Melee"
    );

    MeleeExchange {
        attacker: attacker_id,
        defender: defender_id,
        attacker_points: attack,
        defender_points: defence,
        attacker_casualties,
        defender_casualties,
    }
}

/// Every melee `side` starts this half-round
///
/// `contacts` are fights forced by movement; each attacker fights once, and
/// contacts come first.
pub fn process_melee(
    state: &mut BattleState,
    side: Side,
    contacts: &[(BrigadeId, BrigadeId)],
    config: &CombatConfig,
    rng: &mut dyn RandomSource,
) -> Vec<MeleeExchange> {
    let mut fights: Vec<(usize, usize)> = contacts
        .iter()
        .filter_map(|(a, d)| Some((state.index_of(*a)?, state.index_of(*d)?)))
        .collect();

    for i in state.side_indices(side) {
        if fights.iter().any(|(a, _)| *a == i) {
            continue;
        }
        let brigade = &state.brigades[i];
        if !brigade.can_fight() || !seeks_melee(brigade.active_order().order_type) {
            continue;
        }
        if let Some(j) = adjacent_enemy(state, i) {
            fights.push((i, j));
        }
    }

    let mut exchanges = Vec::new();
    for (i, j) in fights {
        // Earlier fights may have broken or destroyed either party
        let adjacent = match (state.brigades[i].position, state.brigades[j].position) {
            (Some(a), Some(d)) => a.is_adjacent(&d),
            _ => false,
        };
        if !adjacent || !state.brigades[i].can_fight() || !state.brigades[j].is_alive() {
            continue;
        }
        exchanges.push(resolve_melee(state, i, j, config, rng));
    }
    exchanges
}
