//! Brigade orders
//!
//! Every brigade carries a basic order and optionally an additional order
//! that takes over while one of its triggers holds (see `battle::triggers`).
//! Orders are a flat enum of kinds; each processor matches on the kind.

use serde::{Deserialize, Serialize};

use crate::battle::geometry::Position;
use crate::battle::units::Formation;
use crate::core::error::{BattleError, Result};
use crate::core::types::{BrigadeId, Round};

/// Most checkpoints an order may carry
pub const MAX_CHECKPOINTS: usize = 3;

/// Most strategic-point targets an order may carry
pub const MAX_STRATEGIC_TARGETS: usize = 3;

/// What a brigade does once its checkpoints are behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Close with the nearest visible enemy and fight hand to hand
    Engage,
    /// Close to firing range of the nearest visible enemy, then hold and fire
    Fire,
    /// Hold the final checkpoint, returning to it when pushed off
    DefendPosition,
    /// Fall back away from the nearest enemy
    Retreat,
    /// Keep a fixed distance from the nearest visible enemy
    MaintainDistance,
    /// Keep station on a leader brigade
    FollowDetachment,
    /// Retake own strategic points held by the enemy
    RecoverOwnStrategicPoints,
    /// Take strategic points held by the enemy
    AttackEnemyStrategicPoints,
    DestroyBridges,
    DestroyFortifications,
    BuildPontoonBridge,
    DigEntrenchment,
}

impl OrderType {
    /// Order types that need at least one checkpoint to know where to act
    pub fn requires_checkpoint(&self) -> bool {
        matches!(self, OrderType::DefendPosition | OrderType::BuildPontoonBridge)
    }

    /// Order types that keep the brigade stationary while it works
    pub fn is_engineering(&self) -> bool {
        matches!(
            self,
            OrderType::DestroyBridges
                | OrderType::DestroyFortifications
                | OrderType::BuildPontoonBridge
                | OrderType::DigEntrenchment
        )
    }
}

/// Station kept relative to a detachment leader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetachmentPosition {
    Front,
    Left,
    Right,
}

/// A waypoint the brigade marches through before executing its order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub position: Position,
    #[serde(default)]
    pub reached: bool,
}

impl Checkpoint {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            reached: false,
        }
    }
}

/// Which strategic point a capture trigger watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategicPointTrigger {
    /// Any point of the relevant owner
    Any,
    /// One configured point
    At(Position),
}

/// Conditions under which an additional order overrides the basic one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderTriggers {
    pub activation_round: Option<Round>,
    /// Side headcount at or below which the order activates
    pub headcount_threshold: Option<u32>,
    /// Activate once the basic order's last checkpoint is reached
    pub last_destination_reached: bool,
    /// Activate while an own strategic point is held by the enemy
    pub own_point_lost: Option<StrategicPointTrigger>,
    /// Activate while an enemy strategic point is held by our side
    pub enemy_point_taken: Option<StrategicPointTrigger>,
}

impl OrderTriggers {
    pub fn is_empty(&self) -> bool {
        self.activation_round.is_none()
            && self.headcount_threshold.is_none()
            && !self.last_destination_reached
            && self.own_point_lost.is_none()
            && self.enemy_point_taken.is_none()
    }
}

/// A brigade order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_type: OrderType,
    #[serde(default)]
    pub formation: Formation,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    #[serde(default)]
    pub strategic_targets: Vec<Position>,
    #[serde(default)]
    pub triggers: OrderTriggers,
    #[serde(default)]
    pub maintain_distance: Option<u32>,
    #[serde(default)]
    pub leader: Option<BrigadeId>,
    #[serde(default)]
    pub detachment_position: Option<DetachmentPosition>,
    /// Attack enemies blocking the route instead of stopping in front of them
    #[serde(default)]
    pub move_through_enemies: bool,
}

impl Order {
    pub fn new(order_type: OrderType) -> Self {
        Self {
            order_type,
            formation: Formation::default(),
            checkpoints: Vec::new(),
            strategic_targets: Vec::new(),
            triggers: OrderTriggers::default(),
            maintain_distance: None,
            leader: None,
            detachment_position: None,
            move_through_enemies: false,
        }
    }

    pub fn with_formation(mut self, formation: Formation) -> Self {
        self.formation = formation;
        self
    }

    pub fn with_checkpoint(mut self, position: Position) -> Self {
        self.checkpoints.push(Checkpoint::new(position));
        self
    }

    pub fn with_strategic_target(mut self, position: Position) -> Self {
        self.strategic_targets.push(position);
        self
    }

    pub fn with_triggers(mut self, triggers: OrderTriggers) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn with_distance(mut self, distance: u32) -> Self {
        self.maintain_distance = Some(distance);
        self
    }

    pub fn following(mut self, leader: BrigadeId, station: DetachmentPosition) -> Self {
        self.leader = Some(leader);
        self.detachment_position = Some(station);
        self
    }

    pub fn through_enemies(mut self) -> Self {
        self.move_through_enemies = true;
        self
    }

    /// First checkpoint not yet reached
    pub fn next_checkpoint(&self) -> Option<Position> {
        self.checkpoints
            .iter()
            .find(|c| !c.reached)
            .map(|c| c.position)
    }

    pub fn final_checkpoint(&self) -> Option<Position> {
        self.checkpoints.last().map(|c| c.position)
    }

    /// Has the brigade arrived at its last checkpoint?
    pub fn last_destination_reached(&self) -> bool {
        !self.checkpoints.is_empty() && self.checkpoints.iter().all(|c| c.reached)
    }

    /// Mark the next checkpoint reached if the brigade stands on it
    pub fn mark_reached(&mut self, position: Position) -> bool {
        match self.checkpoints.iter_mut().find(|c| !c.reached) {
            Some(checkpoint) if checkpoint.position == position => {
                checkpoint.reached = true;
                true
            }
            _ => false,
        }
    }

    /// Reject orders that cannot be executed as given
    pub fn validate(&self, brigade: BrigadeId) -> Result<()> {
        let invalid = |reason: String| BattleError::InvalidOrder { brigade, reason };

        if self.checkpoints.len() > MAX_CHECKPOINTS {
            return Err(invalid(format!(
                "{} checkpoints given, at most {} allowed",
                self.checkpoints.len(),
                MAX_CHECKPOINTS
            )));
        }
        if self.strategic_targets.len() > MAX_STRATEGIC_TARGETS {
            return Err(invalid(format!(
                "{} strategic targets given, at most {} allowed",
                self.strategic_targets.len(),
                MAX_STRATEGIC_TARGETS
            )));
        }
        if self.order_type.requires_checkpoint() && self.checkpoints.is_empty() {
            return Err(invalid(format!(
                "{:?} requires at least one checkpoint",
                self.order_type
            )));
        }

        match self.order_type {
            OrderType::MaintainDistance => match self.maintain_distance {
                Some(distance) if distance > 0 => {}
                _ => return Err(invalid("MaintainDistance requires a positive distance".into())),
            },
            OrderType::FollowDetachment => {
                let Some(leader) = self.leader else {
                    return Err(invalid("FollowDetachment requires a leader brigade".into()));
                };
                if leader == brigade {
                    return Err(invalid("a brigade cannot follow itself".into()));
                }
                if self.detachment_position.is_none() {
                    return Err(invalid("FollowDetachment requires a station".into()));
                }
            }
            _ => {}
        }

        Ok(())
    }
}

/// Validate a brigade's pair of orders
pub fn validate_orders(brigade: BrigadeId, basic: &Order, additional: Option<&Order>) -> Result<()> {
    basic.validate(brigade)?;

    let Some(additional) = additional else {
        return Ok(());
    };
    additional.validate(brigade)?;

    if additional.triggers.is_empty() {
        return Err(BattleError::InvalidOrder {
            brigade,
            reason: "additional order has no trigger and can never activate".into(),
        });
    }
    if additional.triggers.last_destination_reached && basic.checkpoints.is_empty() {
        return Err(BattleError::InvalidOrder {
            brigade,
            reason: "last-destination trigger needs checkpoints on the basic order".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: BrigadeId = BrigadeId(7);

    #[test]
    fn test_checkpoints_reached_in_sequence() {
        let mut order = Order::new(OrderType::Engage)
            .with_checkpoint(Position::new(1, 1))
            .with_checkpoint(Position::new(2, 2));

        assert_eq!(order.next_checkpoint(), Some(Position::new(1, 1)));
        assert!(!order.mark_reached(Position::new(2, 2)));
        assert!(order.mark_reached(Position::new(1, 1)));
        assert!(!order.last_destination_reached());
        assert!(order.mark_reached(Position::new(2, 2)));
        assert!(order.last_destination_reached());
        assert_eq!(order.next_checkpoint(), None);
    }

    #[test]
    fn test_no_checkpoints_never_reached() {
        let order = Order::new(OrderType::Engage);
        assert!(!order.last_destination_reached());
    }

    #[test]
    fn test_defend_requires_checkpoint() {
        let result = Order::new(OrderType::DefendPosition).validate(ID);
        assert!(matches!(result, Err(BattleError::InvalidOrder { .. })));

        let order = Order::new(OrderType::DefendPosition).with_checkpoint(Position::new(3, 3));
        assert!(order.validate(ID).is_ok());
    }

    #[test]
    fn test_too_many_checkpoints() {
        let mut order = Order::new(OrderType::Engage);
        for i in 0..4 {
            order = order.with_checkpoint(Position::new(i, i));
        }
        assert!(order.validate(ID).is_err());
    }

    #[test]
    fn test_maintain_distance_needs_distance() {
        assert!(Order::new(OrderType::MaintainDistance).validate(ID).is_err());
        assert!(Order::new(OrderType::MaintainDistance)
            .with_distance(4)
            .validate(ID)
            .is_ok());
    }

    #[test]
    fn test_follow_detachment_needs_leader() {
        assert!(Order::new(OrderType::FollowDetachment).validate(ID).is_err());
        assert!(Order::new(OrderType::FollowDetachment)
            .following(ID, DetachmentPosition::Left)
            .validate(ID)
            .is_err());
        assert!(Order::new(OrderType::FollowDetachment)
            .following(BrigadeId(1), DetachmentPosition::Left)
            .validate(ID)
            .is_ok());
    }

    #[test]
    fn test_additional_order_needs_trigger() {
        let basic = Order::new(OrderType::Engage);
        let additional = Order::new(OrderType::Retreat);
        assert!(validate_orders(ID, &basic, Some(&additional)).is_err());

        let additional = additional.with_triggers(OrderTriggers {
            activation_round: Some(5),
            ..OrderTriggers::default()
        });
        assert!(validate_orders(ID, &basic, Some(&additional)).is_ok());
    }

    #[test]
    fn test_last_destination_trigger_needs_basic_checkpoints() {
        let basic = Order::new(OrderType::Engage);
        let additional = Order::new(OrderType::Retreat).with_triggers(OrderTriggers {
            last_destination_reached: true,
            ..OrderTriggers::default()
        });
        assert!(validate_orders(ID, &basic, Some(&additional)).is_err());
    }

    #[test]
    fn test_order_from_toml() {
        let order: Order = toml::from_str(
            r#"
            order_type = "DefendPosition"
            formation = "Square"
            checkpoints = [{ position = { x = 4, y = 5 } }]
            "#,
        )
        .expect("order should parse");
        assert_eq!(order.formation, Formation::Square);
        assert_eq!(order.final_checkpoint(), Some(Position::new(4, 5)));
        assert!(order.validate(ID).is_ok());
    }
}
