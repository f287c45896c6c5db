//! Additional-order trigger evaluation
//!
//! Every round each brigade's additional order is re-evaluated from scratch:
//! it is active while any of its triggers holds and the basic order steers
//! the brigade otherwise.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::orders::{OrderTriggers, StrategicPointTrigger};
use crate::battle::relations::NationRelations;
use crate::battle::state::{BattleState, StrategicPointStatus};
use crate::battle::units::Brigade;
use crate::core::types::{BrigadeId, NationId, Round, Side};

/// What the triggers look at, taken once per half-round
#[derive(Debug, Clone)]
pub struct TriggerContext {
    pub round: Round,
    pub side_headcount: [u32; 2],
    pub points: Vec<StrategicPointStatus>,
    pub relations: NationRelations,
}

impl TriggerContext {
    pub fn from_state(state: &BattleState) -> Self {
        Self {
            round: state.round,
            side_headcount: [state.side_headcount(Side::First), state.side_headcount(Side::Second)],
            points: state.strategic_points(),
            relations: state.relations.clone(),
        }
    }

    fn friendly(&self, nation: NationId, other: Option<NationId>) -> bool {
        other.is_some_and(|o| o == nation || self.relations.are_allies(nation, o))
    }

    fn hostile(&self, nation: NationId, other: Option<NationId>) -> bool {
        other.is_some_and(|o| self.relations.are_enemies(nation, o))
    }

    /// An own point (the nation's, or the configured one) held by the enemy
    pub fn own_point_lost(&self, nation: NationId, trigger: StrategicPointTrigger) -> bool {
        self.points.iter().any(|p| {
            let watched = match trigger {
                StrategicPointTrigger::Any => p.owner == Some(nation),
                StrategicPointTrigger::At(pos) => p.position == pos,
            };
            watched && self.hostile(nation, p.holder)
        })
    }

    /// An enemy point (any, or the configured one) held by our side
    pub fn enemy_point_taken(&self, nation: NationId, trigger: StrategicPointTrigger) -> bool {
        self.points.iter().any(|p| {
            let watched = match trigger {
                StrategicPointTrigger::Any => self.hostile(nation, p.owner),
                StrategicPointTrigger::At(pos) => p.position == pos,
            };
            watched && self.friendly(nation, p.holder)
        })
    }
}

/// Does any configured trigger hold for this brigade?
pub fn evaluate_triggers(brigade: &Brigade, triggers: &OrderTriggers, ctx: &TriggerContext) -> bool {
    if triggers.activation_round.is_some_and(|round| ctx.round >= round) {
        return true;
    }
    if triggers
        .headcount_threshold
        .is_some_and(|threshold| ctx.side_headcount[brigade.side.index()] <= threshold)
    {
        return true;
    }
    if triggers.last_destination_reached && brigade.basic_order.last_destination_reached() {
        return true;
    }
    if triggers
        .own_point_lost
        .is_some_and(|t| ctx.own_point_lost(brigade.nation, t))
    {
        return true;
    }
    triggers
        .enemy_point_taken
        .is_some_and(|t| ctx.enemy_point_taken(brigade.nation, t))
}

/// Should the brigade's additional order steer it now?
pub fn additional_order_active(brigade: &Brigade, ctx: &TriggerContext) -> bool {
    brigade
        .additional_order
        .as_ref()
        .is_some_and(|order| evaluate_triggers(brigade, &order.triggers, ctx))
}

/// A brigade switching between its basic and additional order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTransition {
    pub brigade: BrigadeId,
    /// True when the additional order took over, false when it handed back
    pub additional_active: bool,
}

/// Re-evaluate the active order of every brigade of `side`
pub fn process_orders(state: &mut BattleState, side: Side) -> Vec<OrderTransition> {
    let ctx = TriggerContext::from_state(state);
    let mut transitions = Vec::new();

    for i in state.side_indices(side) {
        let brigade = &mut state.brigades[i];
        if !brigade.is_alive() {
            continue;
        }
        let active = additional_order_active(brigade, &ctx);
        if active == brigade.additional_active {
            continue;
        }

        brigade.additional_active = active;
        brigade.formation = brigade.active_order().formation;
        brigade.engineering = None;
        debug!(
            brigade = brigade.id.0,
            additional = active,
            order = ?brigade.active_order().order_type,
            "Order switched"
        );
        transitions.push(OrderTransition {
            brigade: brigade.id,
            additional_active: active,
        });
    }
    transitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::geometry::Position;
    use crate::battle::orders::{Order, OrderType};
    use crate::battle::state::fixtures::*;
    use crate::battle::units::Formation;

    fn with_additional(mut brigade: Brigade, triggers: OrderTriggers) -> Brigade {
        brigade.additional_order = Some(
            Order::new(OrderType::Retreat)
                .with_formation(Formation::Column)
                .with_triggers(triggers),
        );
        brigade
    }

    fn point(state: &mut BattleState, pos: Position, owner: u32, holder: u32) {
        let sector = state.map.get_mut(pos).unwrap();
        sector.strategic_point = true;
        sector.nation = Some(NationId(owner));
        sector.current_holder = Some(NationId(holder));
    }

    #[test]
    fn test_no_additional_order_keeps_basic() {
        let mut state = state(20, vec![infantry(1, 1, Position::new(1, 1))]);
        assert!(process_orders(&mut state, Side::First).is_empty());
        assert_eq!(state.brigades[0].active_order().order_type, OrderType::Engage);
    }

    #[test]
    fn test_activation_round() {
        let b = with_additional(
            infantry(1, 1, Position::new(1, 1)),
            OrderTriggers {
                activation_round: Some(3),
                ..OrderTriggers::default()
            },
        );
        let mut state = state(20, vec![b]);
        state.round = 2;
        assert!(process_orders(&mut state, Side::First).is_empty());
        state.round = 3;
        let transitions = process_orders(&mut state, Side::First);
        assert_eq!(transitions, vec![OrderTransition { brigade: BrigadeId(1), additional_active: true }]);
        assert_eq!(state.brigades[0].active_order().order_type, OrderType::Retreat);
        assert_eq!(state.brigades[0].formation, Formation::Column);
    }

    #[test]
    fn test_headcount_threshold_and_hand_back() {
        let b = with_additional(
            infantry(1, 1, Position::new(1, 1)),
            OrderTriggers {
                headcount_threshold: Some(1500),
                ..OrderTriggers::default()
            },
        );
        let mut state = state(20, vec![b]);
        process_orders(&mut state, Side::First);
        assert!(!state.brigades[0].additional_active);

        state.brigades[0].apply_casualties(600);
        process_orders(&mut state, Side::First);
        assert!(state.brigades[0].additional_active);
    }

    #[test]
    fn test_last_destination_reached() {
        let mut b = with_additional(
            infantry(1, 1, Position::new(1, 1)),
            OrderTriggers {
                last_destination_reached: true,
                ..OrderTriggers::default()
            },
        );
        b.basic_order = Order::new(OrderType::Engage)
            .with_checkpoint(Position::new(2, 2))
            .with_checkpoint(Position::new(3, 3));
        let mut state = state(20, vec![b]);

        process_orders(&mut state, Side::First);
        assert_eq!(state.brigades[0].active_order().order_type, OrderType::Engage);

        state.brigades[0].basic_order.mark_reached(Position::new(2, 2));
        process_orders(&mut state, Side::First);
        assert_eq!(state.brigades[0].active_order().order_type, OrderType::Engage);

        state.brigades[0].basic_order.mark_reached(Position::new(3, 3));
        process_orders(&mut state, Side::First);
        assert_eq!(state.brigades[0].active_order().order_type, OrderType::Retreat);
    }

    #[test]
    fn test_own_point_lost() {
        let b = with_additional(
            infantry(1, 1, Position::new(1, 1)),
            OrderTriggers {
                own_point_lost: Some(StrategicPointTrigger::Any),
                ..OrderTriggers::default()
            },
        );
        let mut state = state(20, vec![b]);
        point(&mut state, Position::new(5, 5), 1, 1);
        process_orders(&mut state, Side::First);
        assert!(!state.brigades[0].additional_active);

        point(&mut state, Position::new(5, 5), 1, 2);
        process_orders(&mut state, Side::First);
        assert!(state.brigades[0].additional_active);

        // Retaken: the basic order steers again
        point(&mut state, Position::new(5, 5), 1, 1);
        let transitions = process_orders(&mut state, Side::First);
        assert_eq!(transitions[0].additional_active, false);
    }

    #[test]
    fn test_enemy_point_taken_at_position() {
        let watched = Position::new(8, 8);
        let b = with_additional(
            infantry(1, 1, Position::new(1, 1)),
            OrderTriggers {
                enemy_point_taken: Some(StrategicPointTrigger::At(watched)),
                ..OrderTriggers::default()
            },
        );
        let mut state = state(20, vec![b]);
        point(&mut state, Position::new(4, 4), 2, 1);
        point(&mut state, watched, 2, 2);
        process_orders(&mut state, Side::First);
        assert!(!state.brigades[0].additional_active);

        point(&mut state, watched, 2, 1);
        process_orders(&mut state, Side::First);
        assert!(state.brigades[0].additional_active);
    }
}
