//! Field battle engine: one battle from generated map to result
//!
//! A battle is fought on a square grid of sectors in rounds of two
//! half-rounds, one per side. Brigades follow a basic order, or a
//! conditional additional order while its triggers hold, and the battle ends
//! when one side's morale falls below half of the other's.

pub mod battle_map;
pub mod commander;
pub mod engineering;
pub mod execution;
pub mod geometry;
pub mod mapgen;
pub mod melee;
pub mod morale;
pub mod movement;
pub mod occupancy;
pub mod orders;
pub mod pathfinding;
pub mod ranged;
pub mod relations;
pub mod replay;
pub mod roster;
pub mod setup;
pub mod state;
pub mod terrain;
pub mod triggers;
pub mod units;
pub mod victory;
pub mod visibility;

// Re-exports for convenient access
pub use battle_map::{BattleMap, Sector};
pub use execution::{BattleEvent, BattleEventType, BattlePhase, BattleResult, BrigadeOutcome, FieldBattle};
pub use geometry::{Direction, Position, Rect};
pub use mapgen::{GeneratedMap, MapBuilder, MapDimensions, MapRequest};
pub use orders::{DetachmentPosition, Order, OrderTriggers, OrderType, StrategicPointTrigger};
pub use relations::NationRelations;
pub use replay::{HalfRoundRecord, JsonLinesSink, NullReplaySink, ReplaySink, VecReplaySink};
pub use roster::{Roster, RosterProvider, Scenario};
pub use setup::{SetupArea, SetupAreaCalculator};
pub use state::BattleState;
pub use terrain::{ProductionSite, TerrainType};
pub use units::{Battalion, BattalionType, Brigade, Commander, CommanderTraits, Formation, MoraleStatus};
pub use visibility::{line_of_sight, VisibilityProcessor};
