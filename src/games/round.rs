//! Bingo round state machine
//!
//! A [`Round`] owns one game's roster, call sequence and lifecycle. It does no
//! locking of its own: callers hold it exclusively (see
//! [`RoundRegistry`](crate::games::registry::RoundRegistry)) for the duration
//! of each operation. Every operation validates before it mutates, so a
//! rejected call leaves the round untouched.

use crate::common::config::RoundConfig;
use crate::errors::{EngineError, EngineResult};
use crate::games::board::{Board, CARTELA_COUNT, MAX_NUMBER};
use crate::games::drawer::{NumberDrawer, RandomDrawer};
use crate::games::fairness::CallLog;
use crate::games::types::{
    Call, GameOutcome, MarkRejection, PlayerId, PlayerResult, PlayerView, RoundOutcome,
    RoundSnapshot, RoundStatus, WinCheck, WinReason,
};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One player's seat in a round
#[derive(Debug, Clone)]
pub struct PlayerState {
    board: Board,
    marked: BTreeSet<u8>,
    cartela_number: u32,
    joined_at: DateTime<Utc>,
}

impl PlayerState {
    fn new(board: Board, cartela_number: u32) -> Self {
        // Free center cell starts marked
        let marked = BTreeSet::from([board.free_cell()]);
        Self {
            board,
            marked,
            cartela_number,
            joined_at: Utc::now(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn marked(&self) -> &BTreeSet<u8> {
        &self.marked
    }

    pub fn cartela_number(&self) -> u32 {
        self.cartela_number
    }

    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }
}

/// One bingo game instance
pub struct Round {
    id: u64,
    entry_price: u32,
    pool: u64,
    status: RoundStatus,
    called_numbers: Vec<u8>,
    players: BTreeMap<PlayerId, PlayerState>,
    used_cartelas: BTreeSet<u32>,
    winner_id: Option<PlayerId>,
    min_players: usize,
    max_players: usize,
    created_at: DateTime<Utc>,
    last_call_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    call_log: CallLog,
    drawer: Box<dyn NumberDrawer>,
}

impl Round {
    /// Create a waiting round. The entry price must be one the config accepts.
    pub fn new(id: u64, entry_price: u32, config: &RoundConfig) -> EngineResult<Self> {
        if !config.accepts_entry_price(entry_price) {
            return Err(EngineError::InvalidEntryPrice(entry_price));
        }
        if config.min_players == 0 || config.max_players < config.min_players {
            return Err(EngineError::InvalidConfiguration {
                field: "rounds.min_players".to_string(),
                value: config.min_players.to_string(),
                reason: format!("Must be between 1 and max_players ({})", config.max_players),
            });
        }

        tracing::info!(round_id = id, entry_price, "Round created");

        Ok(Self {
            id,
            entry_price,
            pool: 0,
            status: RoundStatus::Waiting,
            called_numbers: Vec::with_capacity(MAX_NUMBER as usize),
            players: BTreeMap::new(),
            used_cartelas: BTreeSet::new(),
            winner_id: None,
            min_players: config.min_players,
            max_players: config.max_players.min(CARTELA_COUNT as usize),
            created_at: Utc::now(),
            last_call_at: None,
            finished_at: None,
            call_log: CallLog::new(id),
            drawer: Box::new(RandomDrawer::new()),
        })
    }

    /// Replace the number source (seeded or scripted draws)
    pub fn with_drawer(mut self, drawer: impl NumberDrawer + 'static) -> Self {
        self.drawer = Box::new(drawer);
        self
    }

    /// Seat a player on a derived board. With no cartela given, a free one
    /// is picked uniformly at random. May auto-start the round.
    pub fn join(&mut self, player_id: PlayerId, cartela_number: Option<u32>) -> EngineResult<Board> {
        self.check_seat_available(player_id)?;

        let cartela_number = match cartela_number {
            Some(cartela) => {
                self.check_cartela(cartela)?;
                cartela
            }
            None => self
                .available_cartelas()
                .choose(&mut rand::thread_rng())
                .copied()
                .ok_or(EngineError::NoCartelasAvailable(self.id))?,
        };

        let board = Board::derive(cartela_number);
        self.seat(player_id, cartela_number, board);
        Ok(board)
    }

    /// Seat a player on a board that was built elsewhere, e.g. restored from
    /// a persisted round. Same checks and side effects as [`Round::join`].
    pub fn join_with_board(
        &mut self,
        player_id: PlayerId,
        cartela_number: u32,
        board: Board,
    ) -> EngineResult<()> {
        self.check_seat_available(player_id)?;
        self.check_cartela(cartela_number)?;
        self.seat(player_id, cartela_number, board);
        Ok(())
    }

    fn check_seat_available(&self, player_id: PlayerId) -> EngineResult<()> {
        if self.status == RoundStatus::Finished {
            return Err(EngineError::RoundClosed(self.id));
        }
        if self.players.contains_key(&player_id) {
            return Err(EngineError::AlreadyJoined {
                round_id: self.id,
                player_id,
            });
        }
        if self.players.len() >= self.max_players {
            return Err(EngineError::RoundFull {
                round_id: self.id,
                max_players: self.max_players,
            });
        }
        Ok(())
    }

    fn check_cartela(&self, cartela: u32) -> EngineResult<()> {
        if !(1..=CARTELA_COUNT).contains(&cartela) {
            return Err(EngineError::CartelaOutOfRange(cartela));
        }
        if self.used_cartelas.contains(&cartela) {
            return Err(EngineError::CartelaTaken {
                round_id: self.id,
                cartela,
            });
        }
        Ok(())
    }

    fn seat(&mut self, player_id: PlayerId, cartela_number: u32, board: Board) {
        self.players
            .insert(player_id, PlayerState::new(board, cartela_number));
        self.used_cartelas.insert(cartela_number);
        self.pool += u64::from(self.entry_price);

        tracing::debug!(
            round_id = self.id,
            player_id,
            cartela_number,
            players = self.players.len(),
            pool = self.pool,
            "Player joined"
        );

        if self.status == RoundStatus::Waiting && self.players.len() >= self.min_players {
            self.start();
        }
    }

    /// Move a waiting round to active and draw the first number.
    /// Returns false (no-op) if the roster is short or the round is not waiting.
    pub fn start(&mut self) -> bool {
        if self.status != RoundStatus::Waiting || self.players.len() < self.min_players {
            return false;
        }

        self.status = RoundStatus::Active;
        tracing::info!(
            round_id = self.id,
            players = self.players.len(),
            pool = self.pool,
            "Round started"
        );

        self.call_number();
        true
    }

    /// Draw the next number. None if the round is not active or the deck is
    /// exhausted; exhausting the deck finishes the round. When the drawer has
    /// nothing usable the number is picked uniformly from the remaining ones.
    pub fn call_number(&mut self) -> Option<Call> {
        if self.status != RoundStatus::Active {
            return None;
        }

        let remaining: Vec<u8> = (1..=MAX_NUMBER)
            .filter(|n| !self.called_numbers.contains(n))
            .collect();
        if remaining.is_empty() {
            self.finish_exhausted();
            return None;
        }

        let number = match self.drawer.draw(&remaining) {
            Some(number) if remaining.contains(&number) => number,
            drawn => {
                if let Some(number) = drawn {
                    tracing::warn!(round_id = self.id, number, "Drawer returned an unavailable number");
                }
                // An active round always draws; fall back to a uniform pick
                *remaining.choose(&mut rand::thread_rng())?
            }
        };

        self.called_numbers.push(number);
        self.call_log.record(number);
        self.last_call_at = Some(Utc::now());

        let call = Call::new(number)?;
        tracing::debug!(
            round_id = self.id,
            call = %call,
            called = self.called_numbers.len(),
            "Number called"
        );

        if self.called_numbers.len() == MAX_NUMBER as usize {
            self.finish_exhausted();
        }

        Some(call)
    }

    fn finish_exhausted(&mut self) {
        if self.status == RoundStatus::Finished {
            return;
        }
        self.status = RoundStatus::Finished;
        self.finished_at = Some(Utc::now());
        tracing::info!(round_id = self.id, "Deck exhausted, round finished");
    }

    /// Mark a called number on a player's board. Re-marking is a no-op success.
    pub fn mark_number(&mut self, player_id: PlayerId, number: u8) -> Result<(), MarkRejection> {
        let called = self.called_numbers.contains(&number);
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(MarkRejection::UnknownPlayer)?;

        if player.marked.contains(&number) {
            return Ok(());
        }
        if !player.board.contains(number) {
            return Err(MarkRejection::NotOnBoard);
        }
        if !called {
            return Err(MarkRejection::NotCalled);
        }

        player.marked.insert(number);
        tracing::debug!(round_id = self.id, player_id, number, "Number marked");
        Ok(())
    }

    /// Check a player's marks for a completed row, column or diagonal.
    ///
    /// Marks are re-validated against the board and the call sequence first;
    /// a mark that fails is reported as invalid rather than scored.
    pub fn check_winner(&self, player_id: PlayerId) -> WinCheck {
        let Some(player) = self.players.get(&player_id) else {
            return WinCheck::lost(WinReason::PlayerNotInRound);
        };

        let free = player.board.free_cell();
        let corrupted = player.marked.iter().any(|&n| {
            n != free && !(player.board.contains(n) && self.called_numbers.contains(&n))
        });
        if corrupted {
            tracing::warn!(round_id = self.id, player_id, "Marked numbers failed validation");
            return WinCheck::lost(WinReason::InvalidMarkedNumbers);
        }

        match player
            .board
            .completed_line(|n| n == free || player.marked.contains(&n))
        {
            Some(reason) => WinCheck::won(reason),
            None => WinCheck::lost(WinReason::KeepPlaying),
        }
    }

    /// Record the winner and finish the round. The winner can only be set once.
    pub fn end_round(&mut self, winner_id: PlayerId) -> EngineResult<()> {
        if let Some(existing) = self.winner_id {
            return Err(EngineError::WinnerAlreadySet {
                round_id: self.id,
                winner_id: existing,
            });
        }
        if !self.players.contains_key(&winner_id) {
            return Err(EngineError::PlayerNotFound {
                round_id: self.id,
                player_id: winner_id,
            });
        }
        // A round finished by deck exhaustion still takes a claim on the last call
        if self.status == RoundStatus::Waiting {
            return Err(EngineError::RoundNotActive {
                round_id: self.id,
                status: self.status,
            });
        }

        self.winner_id = Some(winner_id);
        self.status = RoundStatus::Finished;
        self.finished_at = Some(Utc::now());

        tracing::info!(
            round_id = self.id,
            winner_id,
            pool = self.pool,
            calls = self.called_numbers.len(),
            "Round won"
        );
        Ok(())
    }

    /// Check a player's board and end the round in their favour if it wins
    pub fn claim(&mut self, player_id: PlayerId) -> EngineResult<WinCheck> {
        let check = self.check_winner(player_id);
        if check.won {
            self.end_round(player_id)?;
        }
        Ok(check)
    }

    /// Mark a number, then claim
    pub fn mark_and_claim(&mut self, player_id: PlayerId, number: u8) -> EngineResult<WinCheck> {
        self.mark_number(player_id, number)?;
        self.claim(player_id)
    }

    /// Win/loss lines for the ledger; None until the round is finished
    pub fn outcome(&self) -> Option<RoundOutcome> {
        if self.status != RoundStatus::Finished {
            return None;
        }

        let results = self
            .players
            .iter()
            .map(|(&player_id, player)| {
                let won = self.winner_id == Some(player_id);
                PlayerResult {
                    player_id,
                    cartela_number: player.cartela_number,
                    outcome: if won { GameOutcome::Win } else { GameOutcome::Loss },
                    payout: if won { self.pool } else { 0 },
                }
            })
            .collect();

        Some(RoundOutcome {
            round_id: self.id,
            entry_price: self.entry_price,
            pool: self.pool,
            winner: self.winner_id,
            called_numbers: self.called_numbers.clone(),
            results,
        })
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            round_id: self.id,
            entry_price: self.entry_price,
            pool: self.pool,
            status: self.status,
            called_numbers: self.called_numbers.clone(),
            current_call: self.current_call(),
            player_count: self.players.len(),
            min_players: self.min_players,
            max_players: self.max_players,
            winner_id: self.winner_id,
            created_at: self.created_at,
            last_call_at: self.last_call_at,
            finished_at: self.finished_at,
            call_log_digest: self.call_log.digest_hex(),
        }
    }

    pub fn player_view(&self, player_id: PlayerId) -> Option<PlayerView> {
        self.players.get(&player_id).map(|player| PlayerView {
            player_id,
            cartela_number: player.cartela_number,
            board: player.board.cells().to_vec(),
            marked: player.marked.iter().copied().collect(),
            joined_at: player.joined_at,
        })
    }

    /// Most recent call
    pub fn current_call(&self) -> Option<Call> {
        self.called_numbers.last().copied().and_then(Call::new)
    }

    pub fn used_cartelas(&self) -> Vec<u32> {
        self.used_cartelas.iter().copied().collect()
    }

    pub fn available_cartelas(&self) -> Vec<u32> {
        (1..=CARTELA_COUNT)
            .filter(|c| !self.used_cartelas.contains(c))
            .collect()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn entry_price(&self) -> u32 {
        self.entry_price
    }

    pub fn pool(&self) -> u64 {
        self.pool
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn called_numbers(&self) -> &[u8] {
        &self.called_numbers
    }

    pub fn winner_id(&self) -> Option<PlayerId> {
        self.winner_id
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&PlayerState> {
        self.players.get(&player_id)
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn min_players(&self) -> usize {
        self.min_players
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn call_log_digest(&self) -> String {
        self.call_log.digest_hex()
    }
}

impl fmt::Debug for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Round")
            .field("id", &self.id)
            .field("entry_price", &self.entry_price)
            .field("pool", &self.pool)
            .field("status", &self.status)
            .field("called", &self.called_numbers.len())
            .field("players", &self.players.len())
            .field("winner_id", &self.winner_id)
            .finish_non_exhaustive()
    }
}
