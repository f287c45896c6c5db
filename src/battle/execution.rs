//! Field battle execution loop
//!
//! Each half-round, for the acting side: orders -> movement -> fire -> melee
//! -> commanders -> morale -> rally -> strategic points -> victory.
//! Side one acts first every round. On victory the winner's cavalry pursues
//! once and the battle is over.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::battle::commander::capture_commanders;
use crate::battle::geometry::Position;
use crate::battle::mapgen::{MapBuilder, MapRequest};
use crate::battle::melee::process_melee;
use crate::battle::morale::{check_morale, contributions, process_rally, side_morale};
use crate::battle::movement::process_movement;
use crate::battle::ranged::process_fire;
use crate::battle::replay::{BrigadeSnapshot, HalfRoundRecord, ReplaySink};
use crate::battle::roster::Roster;
use crate::battle::state::BattleState;
use crate::battle::triggers::process_orders;
use crate::battle::victory::{apply_pursuit, check_victory, pursuit_points, PursuitCasualties};
use crate::core::config::BattleConfig;
use crate::core::error::Result;
use crate::core::random::RandomSource;
use crate::core::types::{BrigadeId, CommanderId, NationId, Round, Side};

/// Battle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    #[default]
    Deployment, // Placing brigades
    Active,   // Rounds being fought
    Finished, // Winner recorded or round limit hit
}

/// Log entry for battle milestones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    pub round: Round,
    pub event_type: BattleEventType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEventType {
    BattleStarted,
    BrigadeRouted { brigade: BrigadeId },
    BrigadeRallied { brigade: BrigadeId },
    CommanderCaptured { commander: CommanderId },
    PointTaken { position: Position, nation: NationId },
    BattleEnded { winner: Option<Side> },
}

/// Final state of one brigade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrigadeOutcome {
    pub brigade: BrigadeId,
    pub nation: NationId,
    pub side: Side,
    pub initial_headcount: u32,
    pub headcount: u32,
    pub routing: bool,
}

/// What the battle hands back to whoever started it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleResult {
    pub winner: Option<Side>,
    pub rounds: Round,
    pub side_morale: [u32; 2],
    pub brigades: Vec<BrigadeOutcome>,
    pub pursuit_points: u32,
    pub pursuit: Vec<PursuitCasualties>,
    pub captured: Vec<CommanderId>,
}

impl BattleResult {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn casualties(&self, side: Side) -> u32 {
        self.brigades
            .iter()
            .filter(|b| b.side == side)
            .map(|b| b.initial_headcount.saturating_sub(b.headcount))
            .sum()
    }

    pub fn summary(&self) -> String {
        let winner = match self.winner {
            Some(side) => format!("{side:?} side wins"),
            None => "No winner".to_string(),
        };
        format!(
            "{} after {} rounds (morale {} / {})\nCasualties: {} / {}, pursuit {} points",
            winner,
            self.rounds,
            self.side_morale[0],
            self.side_morale[1],
            self.casualties(Side::First),
            self.casualties(Side::Second),
            self.pursuit_points,
        )
    }
}

/// Runs one field battle from deployment to result
#[derive(Debug, Clone)]
pub struct FieldBattle {
    pub state: BattleState,
    pub config: BattleConfig,
    pub phase: BattlePhase,
    pub winner: Option<Side>,
    pub pursuit_points: u32,
    pub pursuit: Vec<PursuitCasualties>,
    pub captured: Vec<CommanderId>,
    pub battle_log: Vec<BattleEvent>,
}

impl FieldBattle {
    pub fn new(state: BattleState, config: BattleConfig) -> Self {
        Self {
            state,
            config,
            phase: BattlePhase::Deployment,
            winner: None,
            pursuit_points: 0,
            pursuit: Vec::new(),
            captured: Vec::new(),
            battle_log: Vec::new(),
        }
    }

    /// Generate the battlefield for a roster, deploy both sides and start
    pub fn from_roster<R: RandomSource>(roster: Roster, config: BattleConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let mut request = MapRequest::new(roster.terrain, roster.total_battalions());
        if let Some(site) = roster.site {
            request = request.with_site(site, roster.defender);
        }
        let generated = MapBuilder::new().build(&request, rng);

        let mut state = BattleState::new(
            generated.map,
            roster.relations,
            roster.terrain,
            roster.brigades,
            roster.commanders,
        )?;
        state.deploy();

        let mut battle = Self::new(state, config);
        battle.start();
        Ok(battle)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, BattlePhase::Finished)
    }

    /// Start the battle (deployment over, round one begins)
    pub fn start(&mut self) {
        self.phase = BattlePhase::Active;
        self.state.round = 1;
        self.log_event(BattleEventType::BattleStarted, "Battle has begun".into());
        info!(brigades = self.state.brigades.len(), "Battle started");
    }

    fn log_event(&mut self, event_type: BattleEventType, description: String) {
        self.battle_log.push(BattleEvent {
            round: self.state.round,
            event_type,
            description,
        });
    }

    /// Resolve one side's half of the current round
    pub fn run_half_round(
        &mut self,
        side: Side,
        rng: &mut dyn RandomSource,
        sink: &mut dyn ReplaySink,
    ) -> Result<HalfRoundRecord> {
        let mut record = HalfRoundRecord::new(self.state.round, side);
        if self.is_finished() {
            return Ok(record);
        }

        // ===== ORDERS =====
        record.transitions = process_orders(&mut self.state, side);

        // ===== MOVEMENT =====
        let movement = process_movement(&mut self.state, side, &self.config);
        record.moves = movement.moves;
        record.engineering = movement.engineering;

        // ===== COMBAT =====
        record.fire = process_fire(&mut self.state, side, &self.config.combat, rng);
        record.melee = process_melee(&mut self.state, side, &movement.contacts, &self.config.combat, rng);

        // ===== COMMANDERS =====
        record.captured = capture_commanders(&mut self.state);
        for &commander in &record.captured {
            self.captured.push(commander);
            self.log_event(
                BattleEventType::CommanderCaptured { commander },
                format!("Commander {} captured", commander.0),
            );
        }

        // ===== MORALE =====
        for tested in [side, side.opponent()] {
            record
                .routed
                .extend(check_morale(&mut self.state, tested, &self.config.morale, rng));
        }
        record.rallied = process_rally(&mut self.state, side, &self.config.morale, rng);
        for &brigade in &record.routed {
            self.log_event(
                BattleEventType::BrigadeRouted { brigade },
                format!("Brigade {} routs", brigade.0),
            );
        }
        for &brigade in &record.rallied {
            self.log_event(
                BattleEventType::BrigadeRallied { brigade },
                format!("Brigade {} rallies", brigade.0),
            );
        }

        // ===== STRATEGIC POINTS =====
        self.update_holders(side);

        // ===== VICTORY =====
        record.side_morale = [
            side_morale(&self.state, Side::First),
            side_morale(&self.state, Side::Second),
        ];
        record.contributions = Side::all()
            .into_iter()
            .flat_map(|s| contributions(&self.state, s))
            .collect();
        record.brigades = self.state.brigades.iter().map(BrigadeSnapshot::of).collect();

        for brigade in &mut self.state.brigades {
            brigade.recent_casualties = 0;
        }
        self.check_invariants();

        debug!(
            round = record.round,
            ?side,
            first = record.side_morale[0],
            second = record.side_morale[1],
            "Half-round done"
        );
        sink.record(&record)?;

        if let Some(winner) = check_victory(record.side_morale[0], record.side_morale[1]) {
            self.finish(winner, record.side_morale[winner.index()], rng);
        }
        Ok(record)
    }

    /// Both halves of the current round; returns the winner if there is one
    pub fn run_round(&mut self, rng: &mut dyn RandomSource, sink: &mut dyn ReplaySink) -> Result<Option<Side>> {
        for side in Side::all() {
            self.run_half_round(side, rng, sink)?;
            if self.is_finished() {
                return Ok(self.winner);
            }
        }
        self.state.round += 1;
        Ok(None)
    }

    /// Fight until one side wins or the round limit is reached
    pub fn run(&mut self, rng: &mut dyn RandomSource, sink: &mut dyn ReplaySink) -> Result<BattleResult> {
        if self.phase == BattlePhase::Deployment {
            self.start();
        }
        while !self.is_finished() {
            if self.state.round > self.config.max_rounds {
                info!(rounds = self.config.max_rounds, "Round limit reached");
                self.end_battle(None);
                break;
            }
            self.run_round(rng, sink)?;
        }
        sink.flush()?;
        Ok(self.result())
    }

    /// Brigades of `side` standing on a strategic point with no enemy next to them take it
    fn update_holders(&mut self, side: Side) {
        let mut taken = Vec::new();
        for i in self.state.side_indices(side) {
            let brigade = &self.state.brigades[i];
            let Some(pos) = brigade.position else {
                continue;
            };
            if !brigade.can_fight() || self.state.enemy_adjacent(side, pos) {
                continue;
            }
            let nation = brigade.nation;
            if let Some(sector) = self.state.map.get_mut(pos) {
                if sector.strategic_point && sector.current_holder != Some(nation) {
                    sector.current_holder = Some(nation);
                    taken.push((pos, nation));
                }
            }
        }
        for (position, nation) in taken {
            info!(x = position.x, y = position.y, nation = nation.0, "Strategic point taken");
            self.log_event(
                BattleEventType::PointTaken { position, nation },
                format!("Nation {} takes the point at ({}, {})", nation.0, position.x, position.y),
            );
        }
    }

    /// One brigade per sector, and the occupancy index agrees with brigade positions
    fn check_invariants(&self) {
        let on_field = self.state.brigades.iter().filter(|b| b.position.is_some()).count();
        let occupied = self.state.occupancy.occupied_count();
        debug_assert_eq!(on_field, occupied, "occupancy out of step with brigade positions");
        if on_field != occupied {
            error!(on_field, occupied, "Occupancy out of step with brigade positions");
        }
    }

    /// Record the winner and let their cavalry pursue the loser
    fn finish(&mut self, winner: Side, winner_morale: u32, rng: &mut dyn RandomSource) {
        let loser = winner.opponent();
        self.pursuit_points = pursuit_points(&self.state, winner, winner_morale, rng);
        self.pursuit = apply_pursuit(&mut self.state, loser, self.pursuit_points);
        for brigade in &mut self.state.brigades {
            brigade.recent_casualties = 0;
        }
        self.end_battle(Some(winner));
    }

    fn end_battle(&mut self, winner: Option<Side>) {
        self.phase = BattlePhase::Finished;
        self.winner = winner;
        info!(?winner, round = self.state.round, "Battle ended");
        self.log_event(
            BattleEventType::BattleEnded { winner },
            format!("Battle ended: {winner:?}"),
        );
    }

    /// Rounds fought so far, counting the one in progress
    pub fn rounds_played(&self) -> Round {
        if self.is_finished() && self.winner.is_none() {
            self.state.round.saturating_sub(1)
        } else {
            self.state.round
        }
    }

    pub fn result(&self) -> BattleResult {
        BattleResult {
            winner: self.winner,
            rounds: self.rounds_played(),
            side_morale: [
                side_morale(&self.state, Side::First),
                side_morale(&self.state, Side::Second),
            ],
            brigades: self
                .state
                .brigades
                .iter()
                .map(|b| BrigadeOutcome {
                    brigade: b.id,
                    nation: b.nation,
                    side: b.side,
                    initial_headcount: b.initial_headcount,
                    headcount: b.headcount(),
                    routing: b.is_routing(),
                })
                .collect(),
            pursuit_points: self.pursuit_points,
            pursuit: self.pursuit.clone(),
            captured: self.captured.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::orders::{Order, OrderType};
    use crate::battle::replay::VecReplaySink;
    use crate::battle::state::fixtures::*;
    use crate::battle::units::{BattalionType, Brigade, MoraleStatus};
    use crate::core::error::BattleError;
    use crate::core::random::{FixedRandom, SeededRandom};

    fn battle(brigades: Vec<Brigade>) -> FieldBattle {
        let mut battle = FieldBattle::new(state(20, brigades), BattleConfig::default());
        battle.start();
        battle
    }

    #[test]
    fn test_start_moves_to_round_one() {
        let battle = battle(vec![infantry(1, 1, Position::new(5, 2)), infantry(2, 2, Position::new(5, 17))]);
        assert_eq!(battle.phase, BattlePhase::Active);
        assert_eq!(battle.state.round, 1);
        assert_eq!(battle.battle_log[0].event_type, BattleEventType::BattleStarted);
    }

    #[test]
    fn test_half_round_emits_record() {
        let mut battle = battle(vec![infantry(1, 1, Position::new(5, 2)), infantry(2, 2, Position::new(5, 17))]);
        let mut sink = VecReplaySink::new();
        let record = battle
            .run_half_round(Side::First, &mut FixedRandom::low(), &mut sink)
            .unwrap();
        assert_eq!(sink.records.len(), 1);
        assert_eq!(record.side, Side::First);
        assert_eq!(record.moves.len(), 1);
        assert_eq!(record.side_morale, [100, 100]);
        assert_eq!(record.brigades.len(), 2);
        assert!(battle.state.brigades.iter().all(|b| b.recent_casualties == 0));
    }

    #[test]
    fn test_round_advances_after_both_halves() {
        let mut battle = battle(vec![infantry(1, 1, Position::new(5, 2)), infantry(2, 2, Position::new(5, 17))]);
        let mut sink = VecReplaySink::new();
        battle.run_round(&mut FixedRandom::low(), &mut sink).unwrap();
        assert_eq!(battle.state.round, 2);
        assert_eq!(sink.records.len(), 2);
        assert_eq!(sink.records[1].side, Side::Second);
    }

    #[test]
    fn test_collapse_ends_battle_with_pursuit() {
        let mut hussars = brigade(1, 1, BattalionType::light_cavalry(), 2, 300, 5);
        hussars.position = Some(Position::new(2, 2));
        let mut battle = battle(vec![
            hussars,
            infantry(2, 2, Position::new(15, 17)),
            infantry(3, 2, Position::new(17, 17)),
        ]);
        for b in battle.state.brigades.iter_mut().filter(|b| b.side == Side::Second) {
            b.morale_status = MoraleStatus::Routing;
        }

        let mut sink = VecReplaySink::new();
        let winner = battle.run_round(&mut FixedRandom::low(), &mut sink).unwrap();
        assert_eq!(winner, Some(Side::First));
        assert!(battle.is_finished());
        assert!(battle.pursuit_points > 0);
        assert_eq!(battle.pursuit.len(), 2);

        let result = battle.result();
        assert_eq!(result.winner, Some(Side::First));
        assert!(result.casualties(Side::Second) > 0);
        assert!(matches!(
            battle.battle_log.last().map(|e| &e.event_type),
            Some(BattleEventType::BattleEnded { winner: Some(Side::First) })
        ));
    }

    #[test]
    fn test_round_limit_gives_no_winner() {
        let mut battle = battle(vec![infantry(1, 1, Position::new(5, 2)), infantry(2, 2, Position::new(5, 17))]);
        for b in &mut battle.state.brigades {
            b.basic_order = Order::new(OrderType::Retreat);
        }
        battle.config.max_rounds = 3;
        let result = battle.run(&mut FixedRandom::low(), &mut VecReplaySink::new()).unwrap();
        assert_eq!(result.winner, None);
        assert_eq!(result.rounds, 3);
        assert_eq!(result.pursuit_points, 0);
    }

    #[test]
    fn test_replay_flush_failure_fails_run() {
        struct Unflushable;

        impl ReplaySink for Unflushable {
            fn record(&mut self, _record: &HalfRoundRecord) -> Result<()> {
                Ok(())
            }

            fn flush(&mut self) -> Result<()> {
                Err(BattleError::InvalidConfig("replay not written".into()))
            }
        }

        let mut battle = battle(vec![infantry(1, 1, Position::new(5, 2)), infantry(2, 2, Position::new(5, 17))]);
        battle.config.max_rounds = 1;
        assert!(battle.run(&mut FixedRandom::low(), &mut Unflushable).is_err());
    }

    #[test]
    fn test_strategic_point_taken() {
        let point = Position::new(5, 5);
        let mut holder = infantry(1, 1, point);
        holder.basic_order = Order::new(OrderType::DefendPosition).with_checkpoint(point);
        let mut battle = battle(vec![holder, infantry(2, 2, Position::new(15, 17))]);
        {
            let sector = battle.state.map.get_mut(point).unwrap();
            sector.strategic_point = true;
            sector.nation = Some(NationId(2));
        }
        battle
            .run_half_round(Side::First, &mut FixedRandom::low(), &mut VecReplaySink::new())
            .unwrap();
        assert_eq!(battle.state.map.get(point).unwrap().current_holder, Some(NationId(1)));
        assert!(battle
            .battle_log
            .iter()
            .any(|e| matches!(e.event_type, BattleEventType::PointTaken { .. })));
    }

    #[test]
    fn test_seeded_battles_replay_identically() {
        let run = |seed| {
            let mut battle = battle(vec![
                infantry(1, 1, Position::new(5, 4)),
                infantry(2, 1, Position::new(9, 4)),
                infantry(3, 2, Position::new(6, 9)),
                infantry(4, 2, Position::new(10, 9)),
            ]);
            battle.config.max_rounds = 10;
            let mut sink = VecReplaySink::new();
            let result = battle.run(&mut SeededRandom::new(seed), &mut sink).unwrap();
            (result, sink.records)
        };
        assert_eq!(run(7), run(7));
    }
}
