//! Unit hierarchy: Battalion → Brigade, plus the commanders leading them
//!
//! Battalions are the strength pools that take casualties.
//! Brigades are the units that hold a sector, carry orders and rout.
//! Commanders influence the brigades of their side within a radius.

use serde::{Deserialize, Serialize};

use crate::battle::geometry::Position;
use crate::battle::orders::Order;
use crate::core::config::MovementConfig;
use crate::core::types::{BattalionId, BrigadeId, CommanderId, NationId, Round, Side};

/// Arm class of a battalion type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ArmClass {
    #[default]
    Infantry,
    Cavalry,
    Artillery,
}

/// Static attributes of a battalion type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattalionType {
    pub name: String,
    #[serde(default)]
    pub arm: ArmClass,
    /// Long-range (fire) rating
    #[serde(default)]
    pub long_range: u32,
    /// Hand-to-hand rating
    #[serde(default)]
    pub hand_combat: u32,
    #[serde(default)]
    pub light_cavalry: bool,
    #[serde(default)]
    pub cuirassier: bool,
    #[serde(default)]
    pub crack: bool,
    #[serde(default)]
    pub elite: bool,
    #[serde(default)]
    pub engineer: bool,
}

impl BattalionType {
    pub fn new(name: &str, arm: ArmClass, long_range: u32, hand_combat: u32) -> Self {
        Self {
            name: name.to_string(),
            arm,
            long_range,
            hand_combat,
            light_cavalry: false,
            cuirassier: false,
            crack: false,
            elite: false,
            engineer: false,
        }
    }

    pub fn line_infantry() -> Self {
        Self::new("Line Infantry", ArmClass::Infantry, 4, 4)
    }

    pub fn light_cavalry() -> Self {
        Self {
            light_cavalry: true,
            ..Self::new("Light Cavalry", ArmClass::Cavalry, 1, 5)
        }
    }

    pub fn cuirassiers() -> Self {
        Self {
            cuirassier: true,
            ..Self::new("Cuirassiers", ArmClass::Cavalry, 0, 8)
        }
    }

    pub fn foot_artillery() -> Self {
        Self::new("Foot Artillery", ArmClass::Artillery, 10, 1)
    }

    pub fn sappers() -> Self {
        Self {
            engineer: true,
            ..Self::new("Sappers", ArmClass::Infantry, 2, 3)
        }
    }
}

/// Smallest strength pool; takes casualties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battalion {
    pub id: BattalionId,
    pub battalion_type: BattalionType,
    pub headcount: u32,
    pub experience: u32,
    #[serde(default)]
    pub dead: bool,
}

impl Battalion {
    pub fn new(id: BattalionId, battalion_type: BattalionType, headcount: u32, experience: u32) -> Self {
        Self {
            id,
            battalion_type,
            headcount,
            experience,
            dead: headcount == 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.dead && self.headcount > 0
    }

    /// Remove casualties; a battalion emptied of men is dead
    pub fn apply_casualties(&mut self, casualties: u32) -> u32 {
        let taken = casualties.min(self.headcount);
        self.headcount -= taken;
        if self.headcount == 0 {
            self.dead = true;
        }
        taken
    }
}

/// Tactical formation of a brigade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Formation {
    Column,
    #[default]
    Line,
    Square,
    Skirmish,
}

/// Arm type of a whole brigade, derived from its battalions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArmType {
    Infantry,
    Cavalry,
    Artillery,
}

/// Morale status of a brigade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MoraleStatus {
    #[default]
    Normal,
    Routing,
}

/// Engineering work in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineeringTask {
    pub kind: EngineeringKind,
    pub target: Position,
    pub rounds_left: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineeringKind {
    DestroyBridge,
    BuildPontoon,
    DigEntrenchment,
    BatterWall,
}

/// A brigade: the unit that holds a sector, carries orders and routs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brigade {
    pub id: BrigadeId,
    pub name: String,
    pub nation: NationId,
    pub side: Side,
    pub battalions: Vec<Battalion>,

    // Position
    pub position: Option<Position>,
    pub formation: Formation,

    // Orders
    pub basic_order: Order,
    pub additional_order: Option<Order>,
    /// Whether the additional order was active at the last evaluation
    pub additional_active: bool,

    // State
    pub morale_status: MoraleStatus,
    pub routed_in_round: Option<Round>,
    pub engineering: Option<EngineeringTask>,

    // Bookkeeping for morale
    pub initial_headcount: u32,
    pub initial_morale: u32,
    /// Casualties taken during the current half-round
    pub recent_casualties: u32,
}

impl Brigade {
    pub fn new(id: BrigadeId, nation: NationId, side: Side, basic_order: Order) -> Self {
        Self {
            id,
            name: String::new(),
            nation,
            side,
            battalions: Vec::new(),
            position: None,
            formation: basic_order.formation,
            basic_order,
            additional_order: None,
            additional_active: false,
            morale_status: MoraleStatus::Normal,
            routed_in_round: None,
            engineering: None,
            initial_headcount: 0,
            initial_morale: 0,
            recent_casualties: 0,
        }
    }

    /// Living battalions
    pub fn living_battalions(&self) -> impl Iterator<Item = &Battalion> {
        self.battalions.iter().filter(|b| b.is_alive())
    }

    /// Total headcount of living battalions
    pub fn headcount(&self) -> u32 {
        self.living_battalions().map(|b| b.headcount).sum()
    }

    pub fn is_alive(&self) -> bool {
        self.headcount() > 0
    }

    pub fn is_routing(&self) -> bool {
        matches!(self.morale_status, MoraleStatus::Routing)
    }

    /// On the field, alive and not routing
    pub fn can_fight(&self) -> bool {
        self.position.is_some() && self.is_alive() && !self.is_routing()
    }

    /// Arm with the greatest headcount; ties favour infantry, then cavalry
    pub fn arm_type(&self) -> ArmType {
        let mut infantry = 0;
        let mut cavalry = 0;
        let mut artillery = 0;
        for battalion in self.living_battalions() {
            match battalion.battalion_type.arm {
                ArmClass::Infantry => infantry += battalion.headcount,
                ArmClass::Cavalry => cavalry += battalion.headcount,
                ArmClass::Artillery => artillery += battalion.headcount,
            }
        }

        if infantry >= cavalry && infantry >= artillery {
            ArmType::Infantry
        } else if cavalry >= artillery {
            ArmType::Cavalry
        } else {
            ArmType::Artillery
        }
    }

    pub fn is_cavalry(&self) -> bool {
        self.arm_type() == ArmType::Cavalry
    }

    pub fn is_artillery(&self) -> bool {
        self.arm_type() == ArmType::Artillery
    }

    /// Mounted brigades pay more to move through woods
    pub fn is_mounted(&self) -> bool {
        matches!(self.arm_type(), ArmType::Cavalry | ArmType::Artillery)
    }

    pub fn has_crack_or_elite(&self) -> bool {
        self.living_battalions()
            .any(|b| b.battalion_type.crack || b.battalion_type.elite)
    }

    pub fn engineer_battalions(&self) -> u32 {
        self.living_battalions()
            .filter(|b| b.battalion_type.engineer)
            .count() as u32
    }

    /// Movement points available this half-round
    pub fn movement_points(&self, config: &MovementConfig) -> u32 {
        let base = match self.arm_type() {
            ArmType::Infantry => config.infantry_points,
            ArmType::Cavalry => config.cavalry_points,
            ArmType::Artillery => config.artillery_points,
        };
        match self.formation {
            Formation::Column => base + config.column_bonus,
            _ => base,
        }
    }

    /// The order currently steering this brigade
    pub fn active_order(&self) -> &Order {
        match (&self.additional_order, self.additional_active) {
            (Some(order), true) => order,
            _ => &self.basic_order,
        }
    }

    pub fn active_order_mut(&mut self) -> &mut Order {
        match (&mut self.additional_order, self.additional_active) {
            (Some(order), true) => order,
            _ => &mut self.basic_order,
        }
    }

    /// Spread casualties over living battalions in proportion to headcount
    ///
    /// Each battalion takes the floor of its share; the men left over go one
    /// at a time to the largest remainders, earlier battalions first on ties.
    /// Removes exactly `min(casualties, headcount)` and returns that number.
    pub fn apply_casualties(&mut self, casualties: u32) -> u32 {
        let total = self.headcount();
        let casualties = casualties.min(total);
        if casualties == 0 {
            return 0;
        }

        let mut shares: Vec<(usize, u32, u64)> = self
            .battalions
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_alive())
            .map(|(i, b)| {
                let numerator = casualties as u64 * b.headcount as u64;
                (i, (numerator / total as u64) as u32, numerator % total as u64)
            })
            .collect();

        let assigned: u32 = shares.iter().map(|(_, share, _)| share).sum();
        let mut leftover = casualties - assigned;
        shares.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
        for (_, share, _) in shares.iter_mut() {
            if leftover == 0 {
                break;
            }
            *share += 1;
            leftover -= 1;
        }

        let mut removed = 0;
        for (i, share, _) in shares {
            removed += self.battalions[i].apply_casualties(share);
        }
        self.recent_casualties += removed;
        removed
    }
}

/// round(points × part / whole) with integer arithmetic
pub fn proportional_share(points: u32, part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let numerator = points as u64 * part as u64;
    ((numerator + whole as u64 / 2) / whole as u64) as u32
}

/// Commander type flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommanderTraits {
    #[serde(default)]
    pub cavalry_leader: bool,
    #[serde(default)]
    pub artillery_leader: bool,
    #[serde(default)]
    pub stout_defender: bool,
    #[serde(default)]
    pub fearless_attacker: bool,
    #[serde(default)]
    pub legendary: bool,
}

/// Type flag a commander may be queried for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommanderType {
    CavalryLeader,
    ArtilleryLeader,
    StoutDefender,
    FearlessAttacker,
    Legendary,
}

impl CommanderTraits {
    pub fn has(&self, commander_type: CommanderType) -> bool {
        match commander_type {
            CommanderType::CavalryLeader => self.cavalry_leader,
            CommanderType::ArtilleryLeader => self.artillery_leader,
            CommanderType::StoutDefender => self.stout_defender,
            CommanderType::FearlessAttacker => self.fearless_attacker,
            CommanderType::Legendary => self.legendary,
        }
    }
}

/// A commander present at (or absent from) the battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commander {
    pub id: CommanderId,
    pub name: String,
    pub nation: NationId,
    pub side: Side,
    /// Strength / command rating
    pub strc: u32,
    pub traits: CommanderTraits,
    /// Brigade the commander rides with; its position is the commander's
    pub brigade: Option<BrigadeId>,
    pub position: Option<Position>,
    pub dead: bool,
    pub captured: bool,
    pub in_pool: bool,
    pub in_transit: bool,
}

impl Commander {
    pub fn new(id: CommanderId, nation: NationId, side: Side, strc: u32) -> Self {
        Self {
            id,
            name: String::new(),
            nation,
            side,
            strc,
            traits: CommanderTraits::default(),
            brigade: None,
            position: None,
            dead: false,
            captured: false,
            in_pool: false,
            in_transit: false,
        }
    }

    /// Alive and actually with the army
    pub fn is_active(&self) -> bool {
        !self.dead && !self.captured && !self.in_pool && !self.in_transit
    }
}
