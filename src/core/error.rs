use thiserror::Error;

use crate::core::types::{BrigadeId, NationId};

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("Invalid order for brigade {brigade:?}: {reason}")]
    InvalidOrder { brigade: BrigadeId, reason: String },

    #[error("Brigade not found: {0:?}")]
    UnknownBrigade(BrigadeId),

    #[error("Nation {0:?} is not assigned to either side")]
    UnknownNation(NationId),

    #[error("Nation {0:?} is listed on both sides")]
    NationOnBothSides(NationId),

    #[error("Side {0} has no nations or brigades")]
    EmptySide(usize),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;
