use crate::common::config::RoundConfig;
use crate::errors::{EngineError, EngineResult};
use crate::games::round::Round;
use crate::games::types::{RoundOutcome, RoundSnapshot, RoundStatus};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type SharedRound = Arc<Mutex<Round>>;

/// Thread-safe store of live rounds, one lock per round.
///
/// Operations on the same round are serialized by its mutex; distinct rounds
/// never contend with each other.
pub struct RoundRegistry {
    rounds: DashMap<u64, SharedRound>,
    next_id: AtomicU64,
    config: RoundConfig,
}

impl RoundRegistry {
    pub fn new(config: RoundConfig) -> Self {
        Self {
            rounds: DashMap::new(),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    /// Create a waiting round with the next sequential id
    pub fn create_round(&self, entry_price: u32) -> EngineResult<u64> {
        if !self.config.accepts_entry_price(entry_price) {
            return Err(EngineError::InvalidEntryPrice(entry_price));
        }
        loop {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            // Skip ids already claimed through `insert`
            if let Entry::Vacant(slot) = self.rounds.entry(id) {
                let round = Round::new(id, entry_price, &self.config)?;
                slot.insert(Arc::new(Mutex::new(round)));
                return Ok(id);
            }
        }
    }

    /// Register a round built by the caller (custom drawer, restored state).
    /// Fails if a round with the same id is already registered.
    pub fn insert(&self, round: Round) -> EngineResult<u64> {
        let id = round.id();
        match self.rounds.entry(id) {
            Entry::Occupied(_) => Err(EngineError::RoundExists(id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(round)));
                self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
                Ok(id)
            }
        }
    }

    /// Run `f` with exclusive access to one round
    pub fn with_round<T>(&self, round_id: u64, f: impl FnOnce(&mut Round) -> T) -> EngineResult<T> {
        // Release the map shard before taking the round lock
        let shared = self
            .rounds
            .get(&round_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(EngineError::RoundNotFound(round_id))?;

        let mut round = shared
            .lock()
            .map_err(|_| EngineError::LockPoisoned(round_id))?;
        Ok(f(&mut *round))
    }

    /// A waiting round at this price with a free seat, or a new one
    pub fn open_round(&self, entry_price: u32) -> EngineResult<u64> {
        let candidates: Vec<(u64, SharedRound)> = self
            .rounds
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut open: Vec<u64> = candidates
            .into_iter()
            .filter(|(_, shared)| {
                shared.lock().map_or(false, |round| {
                    round.status() == RoundStatus::Waiting
                        && round.entry_price() == entry_price
                        && round.player_count() < round.max_players()
                })
            })
            .map(|(id, _)| id)
            .collect();
        open.sort_unstable();

        match open.first() {
            Some(&id) => Ok(id),
            None => self.create_round(entry_price),
        }
    }

    pub fn snapshot(&self, round_id: u64) -> EngineResult<RoundSnapshot> {
        self.with_round(round_id, |round| round.snapshot())
    }

    /// Snapshots of every round in id order, for dashboards
    pub fn snapshots(&self) -> Vec<RoundSnapshot> {
        self.round_ids()
            .into_iter()
            .filter_map(|id| self.snapshot(id).ok())
            .collect()
    }

    /// Number of rounds in each status
    pub fn count_by_status(&self) -> BTreeMap<RoundStatus, usize> {
        let mut counts = BTreeMap::new();
        for id in self.round_ids() {
            if let Ok(status) = self.with_round(id, |round| round.status()) {
                *counts.entry(status).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn remove(&self, round_id: u64) -> bool {
        self.rounds.remove(&round_id).is_some()
    }

    /// Drop finished rounds, returning their outcomes for settlement
    pub fn drain_finished(&self) -> Vec<RoundOutcome> {
        let mut outcomes = Vec::new();
        for id in self.round_ids() {
            if let Ok(Some(outcome)) = self.with_round(id, |round| round.outcome()) {
                self.rounds.remove(&id);
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Round ids in ascending order
    pub fn round_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.rounds.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

impl Default for RoundRegistry {
    fn default() -> Self {
        Self::new(RoundConfig::default())
    }
}
