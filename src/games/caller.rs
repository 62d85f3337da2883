//! Auto-caller: draws one number per tick for a round and publishes events.

use crate::errors::EngineResult;
use crate::games::registry::RoundRegistry;
use crate::games::types::{RoundEvent, RoundStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// What the caller did before the round left the active state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerSummary {
    pub round_id: u64,
    pub calls_made: usize,
    pub winner: Option<u64>,
}

/// Spawn a task calling numbers on `round_id` every `interval` until the
/// round finishes. Waiting rounds are polled until they start.
pub fn spawn_auto_caller(
    registry: Arc<RoundRegistry>,
    round_id: u64,
    interval: Duration,
    events: broadcast::Sender<RoundEvent>,
) -> JoinHandle<EngineResult<CallerSummary>> {
    tokio::spawn(run_caller(registry, round_id, interval, events))
}

async fn run_caller(
    registry: Arc<RoundRegistry>,
    round_id: u64,
    interval: Duration,
    events: broadcast::Sender<RoundEvent>,
) -> EngineResult<CallerSummary> {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    let mut calls_made = 0;

    loop {
        ticker.tick().await;

        let (status, call, called_count, winner) = registry.with_round(round_id, |round| {
            let call = if round.status() == RoundStatus::Active {
                round.call_number()
            } else {
                None
            };
            (round.status(), call, round.called_numbers().len(), round.winner_id())
        })?;

        if let Some(call) = call {
            calls_made += 1;
            // No subscribers is fine
            let _ = events.send(RoundEvent::NumberCalled {
                round_id,
                call,
                called_count,
            });
        }

        if status == RoundStatus::Finished {
            tracing::info!(round_id, calls_made, ?winner, "Auto-caller stopping");
            let _ = events.send(RoundEvent::Finished { round_id, winner });
            return Ok(CallerSummary {
                round_id,
                calls_made,
                winner,
            });
        }
    }
}
