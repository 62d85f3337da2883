//! Bingo round simulator
//!
//! Runs several rounds concurrently, each driven by an auto-caller, with
//! simulated players that mark every called number on their board and claim
//! as soon as a line completes.

use bingo_engine::common::config::ConfigLoader;
use bingo_engine::games::{spawn_auto_caller, RoundEvent, RoundOutcome, RoundRegistry, WinReason};
use bingo_engine::{EngineResult, PlayerId, RoundStatus};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(name = "bingo-sim")]
#[command(about = "Simulate concurrent bingo rounds", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Number of rounds to run concurrently
    #[arg(long, default_value = "4")]
    rounds: usize,

    /// Players per round
    #[arg(long, default_value = "5")]
    players: usize,

    /// Entry price for every round
    #[arg(long, default_value = "10")]
    entry_price: u32,

    /// Override rounds.min_players
    #[arg(long)]
    min_players: Option<usize>,

    /// Override simulation.call_interval_ms
    #[arg(long)]
    call_interval_ms: Option<u64>,

    /// Print outcomes as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct RoundReport {
    #[serde(flatten)]
    outcome: RoundOutcome,
    pattern: Option<WinReason>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bingo_sim=info,bingo_engine=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(min_players) = args.min_players {
        config.rounds.min_players = min_players;
    }
    if let Some(interval) = args.call_interval_ms {
        config.simulation.call_interval_ms = interval;
    }
    config.validate()?;

    if args.players < config.rounds.min_players {
        return Err(format!(
            "--players ({}) is below min_players ({}); rounds would never start",
            args.players, config.rounds.min_players
        )
        .into());
    }
    if args.players > config.rounds.max_players {
        return Err(format!(
            "--players ({}) exceeds max_players ({})",
            args.players, config.rounds.max_players
        )
        .into());
    }

    info!(
        rounds = args.rounds,
        players = args.players,
        entry_price = args.entry_price,
        "Starting simulation"
    );

    let registry = Arc::new(RoundRegistry::new(config.rounds.clone()));
    let interval = config.simulation.call_interval();

    let tasks: Vec<_> = (0..args.rounds)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let first_player = (i * args.players) as PlayerId + 1;
            tokio::spawn(run_round(
                registry,
                args.entry_price,
                first_player,
                args.players,
                interval,
                config.simulation.event_buffer,
            ))
        })
        .collect();

    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        reports.push(task.await??);
    }
    let counts = registry.count_by_status();
    info!(
        rounds = registry.len(),
        finished = counts.get(&RoundStatus::Finished).copied().unwrap_or(0),
        "All rounds settled"
    );
    registry.drain_finished();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            let outcome = &report.outcome;
            match (outcome.winner, report.pattern) {
                (Some(winner), Some(pattern)) => println!(
                    "🎉 Round {}: player {} won by {} after {} calls, pool {}",
                    outcome.round_id,
                    winner,
                    pattern,
                    outcome.called_numbers.len(),
                    outcome.pool
                ),
                _ => println!(
                    "🏁 Round {}: deck exhausted without a winner, pool {}",
                    outcome.round_id, outcome.pool
                ),
            }
        }
    }

    Ok(())
}

/// Fill one round with players, call it to completion and return its outcome
async fn run_round(
    registry: Arc<RoundRegistry>,
    entry_price: u32,
    first_player: PlayerId,
    players: usize,
    interval: Duration,
    event_buffer: usize,
) -> Result<RoundReport, BoxError> {
    let round_id = registry.create_round(entry_price)?;
    let player_ids: Vec<PlayerId> = (first_player..first_player + players as PlayerId).collect();

    let (events, mut rx) = broadcast::channel(event_buffer);

    registry.with_round(round_id, |round| -> EngineResult<()> {
        for &player in &player_ids {
            round.join(player, None)?;
        }
        Ok(())
    })??;

    let caller = spawn_auto_caller(Arc::clone(&registry), round_id, interval, events);

    // Numbers drawn while the round auto-started
    let mut pattern = mark_called(&registry, round_id, &player_ids)?;

    loop {
        match rx.recv().await {
            Ok(RoundEvent::NumberCalled { call, .. }) => {
                if pattern.is_none() {
                    pattern = mark_number(&registry, round_id, &player_ids, call.number)?;
                }
            }
            Ok(RoundEvent::Finished { .. }) | Err(RecvError::Closed) => break,
            Err(RecvError::Lagged(skipped)) => {
                warn!(round_id, skipped, "Event stream lagged, resyncing marks");
                if pattern.is_none() {
                    pattern = mark_called(&registry, round_id, &player_ids)?;
                }
            }
        }
    }

    let summary = caller.await??;
    info!(round_id, calls = summary.calls_made, winner = ?summary.winner, "Round complete");

    let outcome = registry
        .with_round(round_id, |round| round.outcome())?
        .ok_or_else(|| format!("round {} did not finish", round_id))?;

    Ok(RoundReport { outcome, pattern })
}

/// Every player marks `number` if it is on their board, then claims
fn mark_number(
    registry: &RoundRegistry,
    round_id: u64,
    player_ids: &[PlayerId],
    number: u8,
) -> EngineResult<Option<WinReason>> {
    registry.with_round(round_id, |round| {
        for &player in player_ids {
            if round.mark_number(player, number).is_err() {
                continue;
            }
            let check = round.claim(player)?;
            if check.won {
                return Ok(Some(check.reason));
            }
        }
        Ok(None)
    })?
}

fn mark_called(
    registry: &RoundRegistry,
    round_id: u64,
    player_ids: &[PlayerId],
) -> EngineResult<Option<WinReason>> {
    let called = registry.with_round(round_id, |round| round.called_numbers().to_vec())?;
    for number in called {
        if let Some(reason) = mark_number(registry, round_id, player_ids, number)? {
            return Ok(Some(reason));
        }
    }
    Ok(None)
}
