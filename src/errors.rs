//! Error types for the bingo engine
//!
//! Every failure the engine can report is a value the caller inspects.
//! Nothing in here is fatal: callers re-render state and prompt a retry.

use crate::games::types::{MarkRejection, RoundStatus};
use thiserror::Error;

/// Root error type for engine and registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Configuration value rejected during validation
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfiguration {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Entry price {0} is not one of the accepted prices")]
    InvalidEntryPrice(u32),

    #[error("Player {player_id} already joined round {round_id}")]
    AlreadyJoined { round_id: u64, player_id: u64 },

    #[error("Round {round_id} is full ({max_players} players)")]
    RoundFull { round_id: u64, max_players: usize },

    #[error("Cartela {cartela} is already taken in round {round_id}")]
    CartelaTaken { round_id: u64, cartela: u32 },

    #[error("Cartela {0} is outside 1..=100")]
    CartelaOutOfRange(u32),

    #[error("No cartelas left in round {0}")]
    NoCartelasAvailable(u64),

    #[error("Round {0} is finished and no longer accepts players")]
    RoundClosed(u64),

    #[error("Player {player_id} is not in round {round_id}")]
    PlayerNotFound { round_id: u64, player_id: u64 },

    #[error("Round {round_id} already has winner {winner_id}")]
    WinnerAlreadySet { round_id: u64, winner_id: u64 },

    #[error("Round {round_id} is {status}, expected active")]
    RoundNotActive { round_id: u64, status: RoundStatus },

    #[error("Mark rejected: {0}")]
    MarkRejected(#[from] MarkRejection),

    #[error("Invalid board: {0}")]
    InvalidBoard(String),

    #[error("Round {0} not found")]
    RoundNotFound(u64),

    #[error("Round {0} already exists")]
    RoundExists(u64),

    #[error("Round {0} lock poisoned")]
    LockPoisoned(u64),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Failed to save configuration: {0}")]
    ConfigSave(String),
}

impl EngineError {
    /// Contention errors: the caller should refresh its view and retry
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            EngineError::AlreadyJoined { .. }
                | EngineError::RoundFull { .. }
                | EngineError::CartelaTaken { .. }
                | EngineError::NoCartelasAvailable(_)
                | EngineError::RoundClosed(_)
                | EngineError::RoundNotActive { .. }
                | EngineError::MarkRejected(_)
        )
    }
}

// Convenience type alias for Results
pub type EngineResult<T> = Result<T, EngineError>;
