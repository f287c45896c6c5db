//! Order-driven brigade movement
//!
//! Each brigade first marches through its active order's checkpoints, then
//! acts on the order itself. Marching spends movement points sector by
//! sector along an A* path; a brigade in square never takes more than one
//! step. Routing brigades ignore their orders and run for their own map edge.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::engineering::{work, work_site, EngineeringEvent, WorkSite};
use crate::battle::geometry::Position;
use crate::battle::orders::{DetachmentPosition, OrderType};
use crate::battle::pathfinding::{find_path, PathRequest};
use crate::battle::ranged::brigade_range;
use crate::battle::state::BattleState;
use crate::battle::units::Formation;
use crate::core::config::{BattleConfig, MovementConfig};
use crate::core::types::{BrigadeId, NationId, Side};

/// Sectors between a detachment and its leader
pub const DETACHMENT_SPACING: i32 = 2;

/// Where a brigade wants to go this half-round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveGoal {
    Hold,
    /// Get within `range` sectors of `target` (0 means onto it)
    Within { target: Position, range: u32 },
    /// Open the distance from a threat until it reaches `until`
    Away { threat: Position, until: u32 },
    /// Run for the side's own map edge
    Flee,
}

/// A brigade changing sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub brigade: BrigadeId,
    pub from: Position,
    pub to: Position,
    pub steps: u32,
}

/// Everything movement did for one side
#[derive(Debug, Clone, Default)]
pub struct MovementReport {
    pub moves: Vec<MoveRecord>,
    /// Marches that ran into an enemy while moving through: (attacker, defender)
    pub contacts: Vec<(BrigadeId, BrigadeId)>,
    pub engineering: Vec<EngineeringEvent>,
    /// Terrain changed in a way that can alter sight lines
    pub sight_changed: bool,
}

/// Sector a detachment keeps relative to its leader
pub fn detachment_station(leader: Position, station: DetachmentPosition, side: Side) -> Position {
    let f = side.forward() * DETACHMENT_SPACING;
    match station {
        DetachmentPosition::Front => leader.offset(0, f),
        DetachmentPosition::Left => leader.offset(f, 0),
        DetachmentPosition::Right => leader.offset(-f, 0),
    }
}

/// Row of the side's own map edge
pub fn rear_row(side: Side, size_y: u32) -> i32 {
    match side {
        Side::First => 0,
        Side::Second => size_y as i32 - 1,
    }
}

/// Does the order still have checkpoints to march through?
///
/// The last checkpoint of a pontoon order is the river itself, so it stops
/// counting while the crossing still has to be built.
fn marching(state: &BattleState, i: usize) -> Option<Position> {
    let order = state.brigades[i].active_order();
    let checkpoint = order.next_checkpoint()?;
    let bridging = order.order_type == OrderType::BuildPontoonBridge
        && order.final_checkpoint() == Some(checkpoint)
        && work_site(state, i).is_some();
    (!bridging).then_some(checkpoint)
}

/// Nearest strategic point the order goes after
fn strategic_objective(state: &BattleState, i: usize) -> Option<Position> {
    let brigade = &state.brigades[i];
    let pos = brigade.position?;
    let order = brigade.active_order();
    let nation = brigade.nation;
    let friendly = |n: Option<NationId>| n.is_some_and(|n| state.relations.are_allies(nation, n));

    let wanted = |owner: Option<NationId>, holder: Option<NationId>| match order.order_type {
        OrderType::RecoverOwnStrategicPoints => friendly(owner) && !friendly(holder),
        OrderType::AttackEnemyStrategicPoints => !friendly(owner) && !friendly(holder),
        _ => false,
    };

    state
        .strategic_points()
        .into_iter()
        .filter(|p| order.strategic_targets.is_empty() || order.strategic_targets.contains(&p.position))
        .filter(|p| wanted(p.owner, p.holder))
        .map(|p| p.position)
        .min_by_key(|p| (p.distance(&pos), *p))
}

/// Decide the goal of brigade `i` from its state and active order
pub fn goal_for(state: &mut BattleState, i: usize, config: &BattleConfig) -> MoveGoal {
    let brigade = &state.brigades[i];
    let Some(pos) = brigade.position else {
        return MoveGoal::Hold;
    };
    if brigade.is_routing() {
        return MoveGoal::Flee;
    }
    let side = brigade.side;
    let range = brigade_range(brigade, &config.combat).max(1);
    let order = brigade.active_order().clone();

    if let Some(target) = marching(state, i) {
        return MoveGoal::Within { target, range: 0 };
    }

    let enemy = |state: &mut BattleState| state.nearest_enemy(i, true).and_then(|j| state.brigades[j].position);

    match order.order_type {
        OrderType::Engage => match enemy(state) {
            Some(target) => MoveGoal::Within { target, range: 1 },
            None => MoveGoal::Hold,
        },
        OrderType::Fire => match enemy(state) {
            Some(target) => MoveGoal::Within { target, range },
            None => MoveGoal::Hold,
        },
        OrderType::DefendPosition => match order.final_checkpoint() {
            Some(target) if target != pos => MoveGoal::Within { target, range: 0 },
            _ => MoveGoal::Hold,
        },
        OrderType::Retreat => match enemy(state) {
            Some(threat) => MoveGoal::Away { threat, until: u32::MAX },
            None => MoveGoal::Hold,
        },
        OrderType::MaintainDistance => {
            let wanted = order.maintain_distance.unwrap_or(1);
            let Some(threat) = enemy(state) else {
                return MoveGoal::Hold;
            };
            let distance = pos.distance(&threat);
            if distance < wanted {
                MoveGoal::Away { threat, until: wanted }
            } else if distance > wanted {
                MoveGoal::Within {
                    target: threat,
                    range: wanted,
                }
            } else {
                MoveGoal::Hold
            }
        }
        OrderType::FollowDetachment => {
            let (Some(leader), Some(station)) = (order.leader, order.detachment_position) else {
                return MoveGoal::Hold;
            };
            let Some(leader_pos) = state.brigade(leader).filter(|b| b.is_alive()).and_then(|b| b.position) else {
                return MoveGoal::Hold;
            };
            let target = detachment_station(leader_pos, station, side);
            if target == pos {
                MoveGoal::Hold
            } else if state.map.get(target).is_some_and(|s| s.is_passable()) && state.occupancy.is_free(target) {
                MoveGoal::Within { target, range: 0 }
            } else {
                MoveGoal::Within {
                    target: leader_pos,
                    range: 1,
                }
            }
        }
        OrderType::RecoverOwnStrategicPoints | OrderType::AttackEnemyStrategicPoints => {
            match strategic_objective(state, i) {
                Some(target) => {
                    let range = if target == pos || state.occupancy.is_free(target) { 0 } else { 1 };
                    MoveGoal::Within { target, range }
                }
                None => MoveGoal::Hold,
            }
        }
        OrderType::DestroyBridges
        | OrderType::DestroyFortifications
        | OrderType::BuildPontoonBridge
        | OrderType::DigEntrenchment => match work_site(state, i) {
            Some(site) => MoveGoal::Within {
                target: site.target,
                range: site.reach,
            },
            None => MoveGoal::Hold,
        },
    }
}

/// Is `goal` already met at `pos`?
fn satisfied(goal: MoveGoal, pos: Position) -> bool {
    match goal {
        MoveGoal::Hold => true,
        MoveGoal::Within { target, range } => pos.distance(&target) <= range,
        MoveGoal::Away { threat, until } => pos.distance(&threat) >= until,
        MoveGoal::Flee => false,
    }
}

/// Next sector of a greedy walk: further from a threat, or nearer the rear edge
fn greedy_step(state: &BattleState, i: usize, from: Position, goal: MoveGoal) -> Option<Position> {
    let rear = rear_row(state.brigades[i].side, state.map.size_y);
    // Lower is better; a step must strictly improve on standing still
    let score = |p: Position| -> (i64, i32) {
        match goal {
            MoveGoal::Away { threat, .. } => (-i64::from(p.distance(&threat)), (p.y - rear).abs()),
            _ => (i64::from((p.y - rear).abs()), (p.x - from.x).abs()),
        }
    };

    let here = score(from);
    state
        .map
        .neighbors(from)
        .filter(|n| state.occupancy.is_free(*n))
        .filter(|n| state.map.get(*n).is_some_and(|s| s.is_passable()))
        .map(|n| (score(n), n))
        .filter(|(s, _)| s.0 < here.0)
        .min()
        .map(|(_, n)| n)
}

/// Sectors brigade `i` would walk to reach `goal`, excluding its own sector
fn planned_path(state: &BattleState, i: usize, from: Position, goal: MoveGoal, config: &MovementConfig) -> Vec<Position> {
    let MoveGoal::Within { target, range } = goal else {
        return Vec::new();
    };
    let brigade = &state.brigades[i];
    let id = brigade.id;
    let side = brigade.side;
    let through = brigade.active_order().move_through_enemies;

    let blocked = |p: Position| match state.occupancy.at(p) {
        None => false,
        Some(other) if other == id => false,
        Some(other) => {
            let enemy = state.brigade(other).is_some_and(|b| b.side != side);
            !(through && enemy)
        }
    };
    let request = PathRequest {
        start: from,
        goal: target,
        adjacent_to_goal: range > 0,
        mounted: brigade.is_mounted(),
        config,
        blocked: &blocked,
    };

    match find_path(&state.map, &request) {
        Some(path) => path.into_iter().skip(1).collect(),
        None => {
            debug!(brigade = id.0, x = target.x, y = target.y, "No path to goal");
            Vec::new()
        }
    }
}

/// Walk brigade `i` towards its goal; returns the move made and any contact
fn walk(
    state: &mut BattleState,
    i: usize,
    goal: MoveGoal,
    config: &MovementConfig,
) -> (Option<MoveRecord>, Option<(BrigadeId, BrigadeId)>) {
    let Some(start) = state.brigades[i].position else {
        return (None, None);
    };
    if satisfied(goal, start) {
        return (None, None);
    }

    let brigade = &state.brigades[i];
    let id = brigade.id;
    let side = brigade.side;
    let mounted = brigade.is_mounted();
    let full_points = brigade.movement_points(config);
    let max_steps = if brigade.formation == Formation::Square {
        config.square_max_steps
    } else {
        u32::MAX
    };

    let mut path = planned_path(state, i, start, goal, config).into_iter();
    let mut points = full_points;
    let mut steps = 0;
    let mut pos = start;
    let mut contact = None;

    while steps < max_steps {
        let next = match goal {
            MoveGoal::Within { .. } => path.next(),
            _ => greedy_step(state, i, pos, goal),
        };
        let Some(next) = next else {
            break;
        };

        if let Some(other) = state.occupancy.at(next) {
            if state.brigade(other).is_some_and(|b| b.side != side) {
                contact = Some((id, other));
            }
            break;
        }

        let Some(cost) = state
            .map
            .get(next)
            .and_then(|s| s.movement_cost(state.map.altitude(pos), mounted, config))
        else {
            break;
        };
        // A brigade with its full allowance may always take one step
        if cost > points && points < full_points {
            break;
        }
        if !state.move_brigade(i, next) {
            break;
        }
        points = points.saturating_sub(cost);
        steps += 1;
        pos = next;

        if state.brigades[i].active_order_mut().mark_reached(pos) {
            debug!(brigade = id.0, x = pos.x, y = pos.y, "Checkpoint reached");
            break;
        }
        if satisfied(goal, pos) {
            break;
        }
    }

    let record = (steps > 0).then_some(MoveRecord {
        brigade: id,
        from: start,
        to: pos,
        steps,
    });
    (record, contact)
}

/// Work site brigade `i` is standing at, if it is done marching
fn site_in_reach(state: &BattleState, i: usize) -> Option<WorkSite> {
    let brigade = &state.brigades[i];
    if brigade.is_routing() || !brigade.active_order().order_type.is_engineering() {
        return None;
    }
    let pos = brigade.position?;
    if marching(state, i).is_some() {
        return None;
    }
    work_site(state, i).filter(|site| pos.distance(&site.target) <= site.reach)
}

/// Move every brigade of `side`, and let engineers work where they stand
pub fn process_movement(state: &mut BattleState, side: Side, config: &BattleConfig) -> MovementReport {
    let mut report = MovementReport::default();

    for i in state.side_indices(side) {
        let Some(pos) = state.brigades[i].position else {
            continue;
        };
        if !state.brigades[i].is_alive() {
            continue;
        }
        // Starting on a checkpoint counts as reaching it
        if !state.brigades[i].is_routing() {
            state.brigades[i].active_order_mut().mark_reached(pos);
        }

        if let Some(site) = site_in_reach(state, i) {
            if let Some((event, sight_changed)) = work(state, i, site, &config.engineering) {
                if sight_changed {
                    state.visibility.invalidate();
                    report.sight_changed = true;
                }
                report.engineering.push(event);
            }
            continue;
        }

        let goal = goal_for(state, i, config);
        let (record, contact) = walk(state, i, goal, &config.movement);
        if let Some(record) = record {
            debug!(
                brigade = record.brigade.0,
                steps = record.steps,
                x = record.to.x,
                y = record.to.y,
                "Moved"
            );
            report.moves.push(record);
        }
        report.contacts.extend(contact);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::orders::Order;
    use crate::battle::state::fixtures::*;
    use crate::battle::terrain::River;
    use crate::battle::units::{Battalion, BattalionType, Brigade, MoraleStatus};
    use crate::core::types::BattalionId;

    fn ordered(mut brigade: Brigade, order: Order) -> Brigade {
        brigade.basic_order = order;
        brigade
    }

    fn position(state: &BattleState, i: usize) -> Position {
        state.brigades[i].position.unwrap()
    }

    #[test]
    fn test_march_through_checkpoints() {
        let config = BattleConfig::default();
        let order = Order::new(OrderType::DefendPosition)
            .with_checkpoint(Position::new(5, 2))
            .with_checkpoint(Position::new(5, 4));
        let mut state = state(20, vec![ordered(infantry(1, 1, Position::new(5, 0)), order)]);

        process_movement(&mut state, Side::First, &config);
        assert_eq!(position(&state, 0), Position::new(5, 2));
        process_movement(&mut state, Side::First, &config);
        assert_eq!(position(&state, 0), Position::new(5, 4));
        assert!(state.brigades[0].basic_order.last_destination_reached());

        let report = process_movement(&mut state, Side::First, &config);
        assert!(report.moves.is_empty());
    }

    #[test]
    fn test_starting_on_checkpoint_reaches_it() {
        let config = BattleConfig::default();
        let order = Order::new(OrderType::DefendPosition).with_checkpoint(Position::new(5, 5));
        let mut state = state(20, vec![ordered(infantry(1, 1, Position::new(5, 5)), order)]);
        process_movement(&mut state, Side::First, &config);
        assert!(state.brigades[0].basic_order.last_destination_reached());
    }

    #[test]
    fn test_defender_returns_to_position() {
        let config = BattleConfig::default();
        let post = Position::new(5, 5);
        let order = Order::new(OrderType::DefendPosition).with_checkpoint(post);
        let mut state = state(20, vec![ordered(infantry(1, 1, post), order)]);
        process_movement(&mut state, Side::First, &config);
        assert!(state.brigades[0].basic_order.last_destination_reached());

        // Pushed three sectors off its post
        assert!(state.move_brigade(0, Position::new(5, 8)));
        assert_eq!(goal_for(&mut state, 0, &config), MoveGoal::Within { target: post, range: 0 });

        let report = process_movement(&mut state, Side::First, &config);
        assert_eq!(report.moves.len(), 1);
        assert_eq!(position(&state, 0), post);

        let report = process_movement(&mut state, Side::First, &config);
        assert!(report.moves.is_empty());
    }

    #[test]
    fn test_movement_points_limit_steps() {
        let config = BattleConfig::default();
        let order = Order::new(OrderType::DefendPosition).with_checkpoint(Position::new(5, 15));
        let mut state = state(20, vec![ordered(infantry(1, 1, Position::new(5, 0)), order)]);
        let report = process_movement(&mut state, Side::First, &config);
        // 6 points on open ground at 2 per sector
        assert_eq!(report.moves[0].steps, 3);
        assert_eq!(position(&state, 0).y, 3);
    }

    #[test]
    fn test_square_moves_one_step() {
        let config = BattleConfig::default();
        let order = Order::new(OrderType::DefendPosition)
            .with_formation(Formation::Square)
            .with_checkpoint(Position::new(5, 15));
        let mut state = state(20, vec![ordered(infantry(1, 1, Position::new(5, 0)), order)]);
        let report = process_movement(&mut state, Side::First, &config);
        assert_eq!(report.moves[0].steps, 1);
    }

    #[test]
    fn test_engage_closes_to_contact() {
        let config = BattleConfig::default();
        let mut cavalry = brigade(1, 1, BattalionType::light_cavalry(), 2, 400, 4);
        cavalry.position = Some(Position::new(5, 2));
        let mut state = state(20, vec![cavalry, infantry(2, 2, Position::new(5, 6))]);
        process_movement(&mut state, Side::First, &config);
        assert_eq!(position(&state, 0).distance(&Position::new(5, 6)), 1);
    }

    #[test]
    fn test_fire_order_stops_in_range() {
        let config = BattleConfig::default();
        let order = Order::new(OrderType::Fire);
        let mut state = state(
            20,
            vec![ordered(infantry(1, 1, Position::new(5, 2)), order), infantry(2, 2, Position::new(5, 7))],
        );
        process_movement(&mut state, Side::First, &config);
        let pos = position(&state, 0);
        assert_eq!(pos.y, 5);
        assert_eq!(pos.distance(&Position::new(5, 7)), config.combat.infantry_range);
    }

    #[test]
    fn test_no_visible_enemy_holds() {
        let config = BattleConfig::default();
        let mut state = state(20, vec![infantry(1, 1, Position::new(5, 2)), infantry(2, 2, Position::new(5, 9))]);
        for x in 0..20 {
            state.map.get_mut(Position::new(x, 5)).unwrap().chateau = true;
        }
        state.visibility.invalidate();
        let report = process_movement(&mut state, Side::First, &config);
        assert!(report.moves.is_empty());
    }

    #[test]
    fn test_retreat_opens_distance() {
        let config = BattleConfig::default();
        let order = Order::new(OrderType::Retreat);
        let mut state = state(
            20,
            vec![ordered(infantry(1, 1, Position::new(5, 5)), order), infantry(2, 2, Position::new(5, 8))],
        );
        process_movement(&mut state, Side::First, &config);
        assert_eq!(position(&state, 0).distance(&Position::new(5, 8)), 6);
    }

    #[test]
    fn test_maintain_distance_closes_in() {
        let config = BattleConfig::default();
        let order = Order::new(OrderType::MaintainDistance).with_distance(4);
        let mut state = state(
            20,
            vec![ordered(infantry(1, 1, Position::new(5, 2)), order), infantry(2, 2, Position::new(5, 12))],
        );
        process_movement(&mut state, Side::First, &config);
        assert_eq!(position(&state, 0).distance(&Position::new(5, 12)), 7);
    }

    #[test]
    fn test_maintain_distance_backs_off() {
        let config = BattleConfig::default();
        let order = Order::new(OrderType::MaintainDistance).with_distance(4);
        let mut state = state(
            20,
            vec![ordered(infantry(1, 1, Position::new(5, 6)), order), infantry(2, 2, Position::new(5, 8))],
        );
        process_movement(&mut state, Side::First, &config);
        assert_eq!(position(&state, 0).distance(&Position::new(5, 8)), 4);
    }

    #[test]
    fn test_follow_detachment_station() {
        assert_eq!(
            detachment_station(Position::new(10, 10), DetachmentPosition::Front, Side::First),
            Position::new(10, 12)
        );
        assert_eq!(
            detachment_station(Position::new(10, 10), DetachmentPosition::Left, Side::Second),
            Position::new(8, 10)
        );

        let config = BattleConfig::default();
        let order = Order::new(OrderType::FollowDetachment).following(BrigadeId(1), DetachmentPosition::Front);
        let leader = ordered(
            infantry(1, 1, Position::new(5, 5)),
            Order::new(OrderType::DefendPosition).with_checkpoint(Position::new(5, 5)),
        );
        let mut state = state(20, vec![leader, ordered(infantry(2, 1, Position::new(5, 2)), order)]);
        process_movement(&mut state, Side::First, &config);
        process_movement(&mut state, Side::First, &config);
        assert_eq!(position(&state, 0), Position::new(5, 5));
        assert_eq!(position(&state, 1), Position::new(5, 7));
    }

    #[test]
    fn test_routing_brigade_flees_to_own_edge() {
        let config = BattleConfig::default();
        let mut state = state(20, vec![infantry(1, 2, Position::new(5, 10))]);
        state.brigades[0].morale_status = MoraleStatus::Routing;
        process_movement(&mut state, Side::Second, &config);
        assert_eq!(position(&state, 0), Position::new(5, 13));
        assert_eq!(rear_row(Side::Second, 20), 19);
    }

    #[test]
    fn test_blocked_by_friend_without_contact() {
        let config = BattleConfig::default();
        let order = Order::new(OrderType::DefendPosition).with_checkpoint(Position::new(5, 3));
        let mut state = state(
            20,
            vec![ordered(infantry(1, 1, Position::new(5, 1)), order), infantry(2, 1, Position::new(5, 3))],
        );
        let report = process_movement(&mut state, Side::First, &config);
        assert!(report.contacts.is_empty());
        assert_eq!(position(&state, 0), Position::new(5, 1));
    }

    #[test]
    fn test_move_through_enemies_makes_contact() {
        let config = BattleConfig::default();
        let order = Order::new(OrderType::DefendPosition)
            .with_checkpoint(Position::new(5, 5))
            .through_enemies();
        let mut state = state(
            20,
            vec![
                ordered(infantry(1, 1, Position::new(5, 3)), order),
                infantry(2, 2, Position::new(4, 4)),
                infantry(3, 2, Position::new(5, 4)),
                infantry(4, 2, Position::new(6, 4)),
            ],
        );
        let report = process_movement(&mut state, Side::First, &config);
        assert_eq!(report.contacts.len(), 1);
        assert_eq!(report.contacts[0].0, BrigadeId(1));
        assert_eq!(position(&state, 0), Position::new(5, 3));
    }

    #[test]
    fn test_engineers_cross_after_pontoon() {
        let mut config = BattleConfig::default();
        config.engineering.build_pontoon_rounds = 1;
        let river = Position::new(5, 6);
        let mut sappers = ordered(
            infantry(1, 1, Position::new(5, 2)),
            Order::new(OrderType::BuildPontoonBridge).with_checkpoint(river),
        );
        sappers
            .battalions
            .push(Battalion::new(BattalionId(99), BattalionType::sappers(), 300, 4));
        let mut state = state(20, vec![sappers]);
        for x in 0..20 {
            state.map.get_mut(Position::new(x, 6)).unwrap().river = Some(River::Major);
        }

        process_movement(&mut state, Side::First, &config);
        assert_eq!(position(&state, 0).y, 5);

        let report = process_movement(&mut state, Side::First, &config);
        assert!(report.engineering[0].completed);
        assert!(state.map.get(river).unwrap().pontoon);

        process_movement(&mut state, Side::First, &config);
        assert_eq!(position(&state, 0), river);
    }
}
