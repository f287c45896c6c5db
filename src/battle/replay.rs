//! Replay records emitted once per half-round
//!
//! The engine hands every finished half-round to a `ReplaySink`; what the
//! sink does with it (keep it, stream it, drop it) is the caller's business.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::battle::engineering::EngineeringEvent;
use crate::battle::geometry::Position;
use crate::battle::melee::MeleeExchange;
use crate::battle::morale::Contribution;
use crate::battle::movement::MoveRecord;
use crate::battle::ranged::FireExchange;
use crate::battle::triggers::OrderTransition;
use crate::battle::units::{Brigade, Formation, MoraleStatus};
use crate::core::error::Result;
use crate::core::types::{BrigadeId, CommanderId, Round, Side};

/// One brigade at the end of a half-round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrigadeSnapshot {
    pub brigade: BrigadeId,
    pub position: Option<Position>,
    pub formation: Formation,
    pub morale_status: MoraleStatus,
    pub headcount: u32,
    /// Casualties taken during this half-round
    pub casualties: u32,
}

impl BrigadeSnapshot {
    pub fn of(brigade: &Brigade) -> Self {
        Self {
            brigade: brigade.id,
            position: brigade.position,
            formation: brigade.formation,
            morale_status: brigade.morale_status,
            headcount: brigade.headcount(),
            casualties: brigade.recent_casualties,
        }
    }
}

/// Everything that happened while one side acted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalfRoundRecord {
    pub round: Round,
    pub side: Side,
    pub brigades: Vec<BrigadeSnapshot>,
    pub transitions: Vec<OrderTransition>,
    pub moves: Vec<MoveRecord>,
    pub engineering: Vec<EngineeringEvent>,
    pub fire: Vec<FireExchange>,
    pub melee: Vec<MeleeExchange>,
    pub routed: Vec<BrigadeId>,
    pub rallied: Vec<BrigadeId>,
    pub captured: Vec<CommanderId>,
    /// Morale of both sides, indexed by side
    pub side_morale: [u32; 2],
    pub contributions: Vec<Contribution>,
}

impl HalfRoundRecord {
    pub fn new(round: Round, side: Side) -> Self {
        Self {
            round,
            side,
            brigades: Vec::new(),
            transitions: Vec::new(),
            moves: Vec::new(),
            engineering: Vec::new(),
            fire: Vec::new(),
            melee: Vec::new(),
            routed: Vec::new(),
            rallied: Vec::new(),
            captured: Vec::new(),
            side_morale: [0, 0],
            contributions: Vec::new(),
        }
    }

    /// Total casualties dealt by fire and melee this half-round
    pub fn combat_casualties(&self) -> u32 {
        let fire: u32 = self
            .fire
            .iter()
            .map(|f| f.casualties + f.ricochet.map_or(0, |r| r.casualties))
            .sum();
        let melee: u32 = self
            .melee
            .iter()
            .map(|m| m.attacker_casualties + m.defender_casualties)
            .sum();
        fire + melee
    }
}

/// Receives one immutable record per half-round
pub trait ReplaySink {
    fn record(&mut self, record: &HalfRoundRecord) -> Result<()>;

    /// Push buffered records out; called once the battle is over
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps every record in memory
#[derive(Debug, Clone, Default)]
pub struct VecReplaySink {
    pub records: Vec<HalfRoundRecord>,
}

impl VecReplaySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplaySink for VecReplaySink {
    fn record(&mut self, record: &HalfRoundRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Discards every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReplaySink;

impl ReplaySink for NullReplaySink {
    fn record(&mut self, _record: &HalfRoundRecord) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON object per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReplaySink for JsonLinesSink<W> {
    fn record(&mut self, record: &HalfRoundRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
