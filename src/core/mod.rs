pub mod config;
pub mod error;
pub mod random;
pub mod types;

pub use config::BattleConfig;
pub use error::{BattleError, Result};
pub use random::{FixedRandom, RandomSource, SeededRandom};
pub use types::{BattalionId, BrigadeId, CommanderId, NationId, Round, Side};
