//! Morale, rout and rally
//!
//! Brigade morale follows the experience of the bulk of its men. Side morale
//! compares what is still standing with what marched onto the field. A
//! brigade that takes casualties tests against a rout threshold that sinks as
//! the rest of its side breaks; routing brigades may rally each half-round.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::battle::commander::side_has;
use crate::battle::state::BattleState;
use crate::battle::units::{Brigade, CommanderType, MoraleStatus};
use crate::core::config::MoraleConfig;
use crate::core::random::RandomSource;
use crate::core::types::{BrigadeId, Side};

/// Morale of a brigade: the experience value held by the most men
///
/// Experience values tied for the most men resolve to their rounded mean.
pub fn brigade_morale(brigade: &Brigade) -> u32 {
    let mut tiers: Vec<(u32, u32)> = Vec::new();
    for battalion in brigade.living_battalions() {
        match tiers.iter_mut().find(|(exp, _)| *exp == battalion.experience) {
            Some((_, headcount)) => *headcount += battalion.headcount,
            None => tiers.push((battalion.experience, battalion.headcount)),
        }
    }

    let Some(most) = tiers.iter().map(|(_, hc)| *hc).max() else {
        return 0;
    };
    let tied: Vec<u32> = tiers
        .iter()
        .filter(|(_, hc)| *hc == most)
        .map(|(exp, _)| *exp)
        .collect();
    let count = tied.len() as u32;
    (tied.iter().sum::<u32>() + count / 2) / count
}

/// Weight of a brigade in its side's morale
pub fn morale_weight(brigade: &Brigade) -> u64 {
    brigade.headcount() as u64 * brigade_morale(brigade) as u64
}

/// Side morale in 0..=100
///
/// 100 × (non-routing headcount × morale) / (initial headcount × initial morale).
pub fn side_morale(state: &BattleState, side: Side) -> u32 {
    let mut current = 0u64;
    let mut initial = 0u64;
    for brigade in state.brigades.iter().filter(|b| b.side == side) {
        initial += brigade.initial_headcount as u64 * brigade.initial_morale as u64;
        if !brigade.is_routing() {
            current += morale_weight(brigade);
        }
    }
    if initial == 0 {
        return 0;
    }
    ((100 * current + initial / 2) / initial).min(100) as u32
}

/// Share of a brigade in its side's current morale weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub brigade: BrigadeId,
    /// Percentage of the side's total, routing brigades included
    pub percent: f64,
}

/// Every brigade's contribution to its side, in id order
pub fn contributions(state: &BattleState, side: Side) -> Vec<Contribution> {
    let brigades: Vec<&Brigade> = state.brigades.iter().filter(|b| b.side == side).collect();
    let total: u64 = brigades.iter().map(|b| morale_weight(b)).sum();
    brigades
        .into_iter()
        .map(|b| Contribution {
            brigade: b.id,
            percent: if total == 0 {
                0.0
            } else {
                100.0 * morale_weight(b) as f64 / total as f64
            },
        })
        .collect()
}

/// Threshold scaled down by the weight of routing side-mates
///
/// round(base × (total − routing) / total) in integer arithmetic.
pub fn rout_threshold(base: u32, total_weight: u64, routing_weight: u64) -> u32 {
    if total_weight == 0 {
        return base;
    }
    let standing = total_weight.saturating_sub(routing_weight);
    ((base as u64 * standing + total_weight / 2) / total_weight) as u32
}

/// Base threshold before contagion: 60 + 5 × morale, +2 under a legendary commander
pub fn base_threshold(morale: u32, legendary: bool, config: &MoraleConfig) -> u32 {
    let mut base = config.rout_base + config.rout_per_morale * morale;
    if legendary {
        base += config.legendary_bonus;
    }
    base
}

/// Test every brigade of `side` that took casualties this half-round
///
/// Brigades are tested in id order; one that routs lowers the thresholds of
/// those tested after it. Returns the brigades that routed.
pub fn check_morale(
    state: &mut BattleState,
    side: Side,
    config: &MoraleConfig,
    rng: &mut dyn RandomSource,
) -> Vec<BrigadeId> {
    let legendary = side_has(state, side, CommanderType::Legendary);
    let mut routed = Vec::new();

    for i in state.side_indices(side) {
        let brigade = &state.brigades[i];
        if brigade.recent_casualties == 0 || !brigade.can_fight() {
            continue;
        }

        let (total, routing) = state
            .brigades
            .iter()
            .filter(|b| b.side == side)
            .fold((0u64, 0u64), |(total, routing), b| {
                let w = morale_weight(b);
                (total + w, routing + if b.is_routing() { w } else { 0 })
            });
        let base = base_threshold(brigade_morale(brigade), legendary, config);
        let threshold = rout_threshold(base, total, routing);
        let roll = rng.percent();
        debug!(brigade = brigade.id.0, roll, threshold, "Morale test");

        if roll > threshold {
            let brigade = &mut state.brigades[i];
            brigade.morale_status = MoraleStatus::Routing;
            brigade.routed_in_round = Some(state.round);
            info!(brigade = brigade.id.0, round = state.round, "Brigade routs");
            routed.push(brigade.id);
        }
    }
    routed
}

/// Rally chance modifier for brigade `i`
///
/// +step with no standing enemy near, +step with a standing crack or elite
/// ally close by, −step with standing enemy cavalry near. Routing brigades
/// on either side count for nothing.
pub fn rally_modifier(state: &BattleState, i: usize, config: &MoraleConfig) -> i32 {
    let brigade = &state.brigades[i];
    let Some(pos) = brigade.position else {
        return 0;
    };

    let mut enemy_near = false;
    let mut elite_ally_near = false;
    let mut enemy_cavalry_near = false;
    for (j, other) in state.brigades.iter().enumerate() {
        if j == i || !other.can_fight() {
            continue;
        }
        let Some(other_pos) = other.position else {
            continue;
        };
        let distance = pos.distance(&other_pos);

        if other.side == brigade.side {
            if distance <= config.rally_ally_radius && other.has_crack_or_elite() {
                elite_ally_near = true;
            }
        } else {
            if distance <= config.rally_enemy_radius {
                enemy_near = true;
            }
            if distance <= config.rally_cavalry_radius && other.is_cavalry() {
                enemy_cavalry_near = true;
            }
        }
    }

    let mut modifier = 0;
    if !enemy_near {
        modifier += config.rally_step;
    }
    if elite_ally_near {
        modifier += config.rally_step;
    }
    if enemy_cavalry_near {
        modifier -= config.rally_step;
    }
    modifier
}

/// Give every routing brigade of `side` its rally roll
pub fn process_rally(
    state: &mut BattleState,
    side: Side,
    config: &MoraleConfig,
    rng: &mut dyn RandomSource,
) -> Vec<BrigadeId> {
    let mut rallied = Vec::new();
    for i in state.side_indices(side) {
        let brigade = &state.brigades[i];
        if !brigade.is_routing() || !brigade.is_alive() || brigade.position.is_none() {
            continue;
        }
        // No rally in the half-round the brigade broke
        if brigade.routed_in_round == Some(state.round) {
            continue;
        }

        let chance = (config.rally_base_chance + rally_modifier(state, i, config)).clamp(0, 100) as u32;
        let roll = rng.percent();
        if roll <= chance {
            let brigade = &mut state.brigades[i];
            brigade.morale_status = MoraleStatus::Normal;
            brigade.routed_in_round = None;
            info!(brigade = brigade.id.0, roll, chance, "Brigade rallies");
            rallied.push(brigade.id);
        }
    }
    rallied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::geometry::Position;
    use crate::battle::state::fixtures::*;
    use crate::battle::units::{Battalion, BattalionType};
    use crate::core::random::FixedRandom;
    use crate::core::types::BattalionId;

    fn mixed(battalions: &[(u32, u32)]) -> Brigade {
        let mut b = brigade(1, 1, BattalionType::line_infantry(), 0, 0, 0);
        for (n, (headcount, experience)) in battalions.iter().enumerate() {
            b.battalions.push(Battalion::new(
                BattalionId(n as u32),
                BattalionType::line_infantry(),
                *headcount,
                *experience,
            ));
        }
        b
    }

    #[test]
    fn test_brigade_morale_follows_majority() {
        assert_eq!(brigade_morale(&mixed(&[(600, 5), (400, 9)])), 5);
        assert_eq!(brigade_morale(&mixed(&[(300, 5), (300, 5), (500, 9)])), 5);
        assert_eq!(brigade_morale(&mixed(&[(200, 2), (200, 5), (200, 5), (300, 8)])), 5);
    }

    #[test]
    fn test_brigade_morale_tie_is_rounded_mean() {
        assert_eq!(brigade_morale(&mixed(&[(500, 4), (500, 7)])), 6);
        assert_eq!(brigade_morale(&mixed(&[(500, 4), (500, 6)])), 5);
    }

    #[test]
    fn test_dead_battalions_ignored() {
        let mut b = mixed(&[(900, 2), (100, 6)]);
        b.battalions[0].apply_casualties(900);
        assert_eq!(brigade_morale(&b), 6);
        assert_eq!(brigade_morale(&mixed(&[])), 0);
    }

    #[test]
    fn test_rout_contagion_fixture() {
        let weights = [2100u64, 1800, 1100, 3000];
        let total: u64 = weights.iter().sum();
        let mut routing = 0;
        let mut thresholds = vec![rout_threshold(80, total, routing)];
        for w in &weights[..3] {
            routing += w;
            thresholds.push(rout_threshold(80, total, routing));
        }
        assert_eq!(thresholds, vec![80, 59, 41, 30]);
    }

    #[test]
    fn test_base_threshold() {
        let config = MoraleConfig::default();
        assert_eq!(base_threshold(4, false, &config), 80);
        assert_eq!(base_threshold(4, true, &config), 82);
    }

    #[test]
    fn test_side_morale_drops_with_losses_and_routs() {
        let mut state = state(
            20,
            vec![infantry(1, 1, Position::new(1, 1)), infantry(2, 1, Position::new(2, 1))],
        );
        assert_eq!(side_morale(&state, Side::First), 100);
        state.brigades[0].apply_casualties(1000);
        assert_eq!(side_morale(&state, Side::First), 75);
        state.brigades[1].morale_status = MoraleStatus::Routing;
        assert_eq!(side_morale(&state, Side::First), 25);
        assert_eq!(side_morale(&state, Side::Second), 0);
    }

    #[test]
    fn test_contributions_sum_to_hundred() {
        let mut state = state(
            20,
            vec![infantry(1, 1, Position::new(1, 1)), infantry(2, 1, Position::new(2, 1))],
        );
        state.brigades[1].apply_casualties(1000);
        let shares = contributions(&state, Side::First);
        assert_eq!(shares.len(), 2);
        assert!((shares[0].percent - 66.666).abs() < 0.01);
        let sum: f64 = shares.iter().map(|c| c.percent).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_only_brigades_with_casualties_test() {
        let config = MoraleConfig::default();
        let mut state = state(
            20,
            vec![infantry(1, 1, Position::new(1, 1)), infantry(2, 1, Position::new(2, 1))],
        );
        state.brigades[1].apply_casualties(100);
        // A roll of 100 beats any threshold below 100
        let mut rng = FixedRandom::new(0.9999);
        let routed = check_morale(&mut state, Side::First, &config, &mut rng);
        assert_eq!(routed, vec![BrigadeId(2)]);
        assert!(!state.brigades[0].is_routing());
    }

    #[test]
    fn test_low_roll_holds() {
        let config = MoraleConfig::default();
        let mut state = state(20, vec![infantry(1, 1, Position::new(1, 1))]);
        state.brigades[0].apply_casualties(100);
        let mut rng = FixedRandom::low();
        assert!(check_morale(&mut state, Side::First, &config, &mut rng).is_empty());
    }

    #[test]
    fn test_rally_modifier_categories() {
        let config = MoraleConfig::default();
        let mut guard = brigade(2, 1, BattalionType::line_infantry(), 2, 500, 6);
        guard.battalions[0].battalion_type.elite = true;
        guard.position = Some(Position::new(3, 3));
        let mut cavalry = brigade(3, 2, BattalionType::light_cavalry(), 2, 400, 4);
        cavalry.position = Some(Position::new(10, 10));
        let mut state = state(30, vec![infantry(1, 1, Position::new(2, 2)), guard, cavalry]);
        state.brigades[0].morale_status = MoraleStatus::Routing;

        // Elite ally near (+10), enemy cavalry near (-10), enemy within 10
        assert_eq!(rally_modifier(&state, 0, &config), 0);

        // Routing enemies count for nothing
        state.brigades[2].morale_status = MoraleStatus::Routing;
        assert_eq!(rally_modifier(&state, 0, &config), 20);

        // Nor do routing allies
        state.brigades[1].morale_status = MoraleStatus::Routing;
        assert_eq!(rally_modifier(&state, 0, &config), 10);
    }

    #[test]
    fn test_rally_roll() {
        let config = MoraleConfig::default();
        let mut state = state(30, vec![infantry(1, 1, Position::new(2, 2))]);
        state.brigades[0].morale_status = MoraleStatus::Routing;
        state.brigades[0].routed_in_round = Some(0);
        state.round = 1;

        // Chance is 40 with no enemy near; a roll of 100 fails
        let mut rng = FixedRandom::new(0.9999);
        assert!(process_rally(&mut state, Side::First, &config, &mut rng).is_empty());

        let mut rng = FixedRandom::low();
        assert_eq!(process_rally(&mut state, Side::First, &config, &mut rng), vec![BrigadeId(1)]);
        assert!(!state.brigades[0].is_routing());
    }

    #[test]
    fn test_no_rally_in_round_of_rout() {
        let config = MoraleConfig::default();
        let mut state = state(30, vec![infantry(1, 1, Position::new(2, 2))]);
        state.brigades[0].morale_status = MoraleStatus::Routing;
        state.brigades[0].routed_in_round = Some(0);
        let mut rng = FixedRandom::low();
        assert!(process_rally(&mut state, Side::First, &config, &mut rng).is_empty());
    }
}
