//! Headless Battle Runner
//!
//! Loads a scenario, fights it once or over a batch of seeds, and prints the
//! results as JSON or text.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;

use field_battle::battle::{
    BattleResult, FieldBattle, JsonLinesSink, NullReplaySink, ReplaySink, RosterProvider, Scenario,
};
use field_battle::core::{BattleConfig, Result, SeededRandom, Side};

/// Headless Battle Runner - resolve field battles from scenario files
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Fight a scenario and report winner, casualties and pursuit")]
struct Args {
    /// Scenario TOML file
    #[arg(long, default_value = "data/scenarios/river_crossing.toml")]
    scenario: PathBuf,

    /// Battle config TOML file (defaults are built in)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Number of battles to fight, one seed each starting at --seed
    #[arg(long, default_value_t = 1)]
    batch: u64,

    /// Override the round limit from the config
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Write the half-round replay of a single battle as JSON lines
    #[arg(long)]
    replay: Option<PathBuf>,
}

/// One battle of a batch
#[derive(Serialize)]
struct SeededResult {
    seed: u64,
    #[serde(flatten)]
    result: BattleResult,
}

/// Win counts over a batch
#[derive(Serialize, Default)]
struct BatchSummary {
    battles: usize,
    first_wins: usize,
    second_wins: usize,
    undecided: usize,
    mean_rounds: f64,
}

impl BatchSummary {
    fn of(results: &[SeededResult]) -> Self {
        let mut summary = Self {
            battles: results.len(),
            ..Self::default()
        };
        for r in results {
            match r.result.winner {
                Some(Side::First) => summary.first_wins += 1,
                Some(Side::Second) => summary.second_wins += 1,
                None => summary.undecided += 1,
            }
        }
        if !results.is_empty() {
            let rounds: u64 = results.iter().map(|r| u64::from(r.result.rounds)).sum();
            summary.mean_rounds = rounds as f64 / results.len() as f64;
        }
        summary
    }
}

fn fight(scenario: &Scenario, config: &BattleConfig, seed: u64, sink: &mut dyn ReplaySink) -> Result<SeededResult> {
    let mut rng = SeededRandom::new(seed);
    let mut battle = FieldBattle::from_roster(scenario.roster()?, config.clone(), &mut rng)?;
    let result = battle.run(&mut rng, sink)?;
    Ok(SeededResult { seed, result })
}

fn run(args: Args) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let mut config = match &args.config {
        Some(path) => BattleConfig::load(path)?,
        None => BattleConfig::default(),
    };
    if let Some(max_rounds) = args.max_rounds {
        config.max_rounds = max_rounds;
    }
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(scenario = %scenario.name, seed, batch = args.batch, "Running");

    if args.batch <= 1 {
        let outcome = match &args.replay {
            Some(path) => {
                let mut sink = JsonLinesSink::new(BufWriter::new(File::create(path)?));
                fight(&scenario, &config, seed, &mut sink)?
            }
            None => fight(&scenario, &config, seed, &mut NullReplaySink)?,
        };
        if args.format == "json" {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            println!("Seed {}: {}", outcome.seed, outcome.result.summary());
        }
        return Ok(());
    }

    if args.replay.is_some() {
        tracing::warn!("Replays are only written for single battles");
    }
    let seeds: Vec<u64> = (0..args.batch).map(|i| seed.wrapping_add(i)).collect();
    let results = seeds
        .par_iter()
        .map(|&s| fight(&scenario, &config, s, &mut NullReplaySink))
        .collect::<Result<Vec<_>>>()?;
    let summary = BatchSummary::of(&results);

    if args.format == "json" {
        let output = serde_json::json!({ "summary": summary, "battles": results });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for outcome in &results {
            println!("Seed {}: {}", outcome.seed, outcome.result.summary());
        }
        println!(
            "{} battles: {} / {} / {} undecided, {:.1} rounds on average",
            summary.battles, summary.first_wins, summary.second_wins, summary.undecided, summary.mean_rounds
        );
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
