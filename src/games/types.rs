use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// External player identifier (chat user id mapped by the transport layer)
pub type PlayerId = u64;

/// Round lifecycle status. Only moves forward: Waiting -> Active -> Finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Waiting,
    Active,
    Finished,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundStatus::Waiting => write!(f, "waiting"),
            RoundStatus::Active => write!(f, "active"),
            RoundStatus::Finished => write!(f, "finished"),
        }
    }
}

/// Board column, each owning a fixed range of 15 numbers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Column {
    B,
    I,
    N,
    G,
    O,
}

impl Column {
    pub const ALL: [Column; 5] = [Column::B, Column::I, Column::N, Column::G, Column::O];

    /// Numbers this column draws from
    pub fn range(self) -> RangeInclusive<u8> {
        let start = self.index() as u8 * 15 + 1;
        start..=start + 14
    }

    /// Position of the column on the board (0 = B)
    pub fn index(self) -> usize {
        match self {
            Column::B => 0,
            Column::I => 1,
            Column::N => 2,
            Column::G => 3,
            Column::O => 4,
        }
    }

    /// Column owning `number`, or None outside 1..=75
    pub fn for_number(number: u8) -> Option<Column> {
        match number {
            1..=15 => Some(Column::B),
            16..=30 => Some(Column::I),
            31..=45 => Some(Column::N),
            46..=60 => Some(Column::G),
            61..=75 => Some(Column::O),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Column::B => 'B',
            Column::I => 'I',
            Column::N => 'N',
            Column::G => 'G',
            Column::O => 'O',
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// One drawn number, rendered for clients as "B-7"
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Call {
    pub number: u8,
    pub column: Column,
}

impl Call {
    /// Build a call for a number in 1..=75
    pub fn new(number: u8) -> Option<Self> {
        Column::for_number(number).map(|column| Self { number, column })
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.column, self.number)
    }
}

/// Why a win check came out the way it did
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    Row,
    Column,
    Diagonal,
    KeepPlaying,
    InvalidMarkedNumbers,
    PlayerNotInRound,
}

impl fmt::Display for WinReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WinReason::Row => write!(f, "row"),
            WinReason::Column => write!(f, "column"),
            WinReason::Diagonal => write!(f, "diagonal"),
            WinReason::KeepPlaying => write!(f, "keep playing"),
            WinReason::InvalidMarkedNumbers => write!(f, "invalid marked numbers"),
            WinReason::PlayerNotInRound => write!(f, "player not in round"),
        }
    }
}

/// Result of a win check, delivered verbatim to the client
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WinCheck {
    pub won: bool,
    pub reason: WinReason,
}

impl WinCheck {
    pub fn won(reason: WinReason) -> Self {
        Self { won: true, reason }
    }

    pub fn lost(reason: WinReason) -> Self {
        Self { won: false, reason }
    }
}

/// Why a mark was refused. Callers treat any of these as "cannot mark yet".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum MarkRejection {
    #[error("player is not in this round")]
    UnknownPlayer,
    #[error("number is not on the player's board")]
    NotOnBoard,
    #[error("number has not been called yet")]
    NotCalled,
}

/// Game outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
}

/// Per-player settlement line handed to the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerResult {
    pub player_id: PlayerId,
    pub cartela_number: u32,
    pub outcome: GameOutcome,
    pub payout: u64,
}

/// Final result of a finished round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundOutcome {
    pub round_id: u64,
    pub entry_price: u32,
    pub pool: u64,
    /// None when the deck ran out without a winner
    pub winner: Option<PlayerId>,
    pub called_numbers: Vec<u8>,
    pub results: Vec<PlayerResult>,
}

/// Read-only view of a round for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round_id: u64,
    pub entry_price: u32,
    pub pool: u64,
    pub status: RoundStatus,
    pub called_numbers: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_call: Option<Call>,
    pub player_count: usize,
    pub min_players: usize,
    pub max_players: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<PlayerId>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_call_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Hex SHA-256 chain over the call order
    pub call_log_digest: String,
}

/// One player's board as shown in the web view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub player_id: PlayerId,
    pub cartela_number: u32,
    pub board: Vec<u8>,
    pub marked: Vec<u8>,
    pub joined_at: DateTime<Utc>,
}

/// Events published while a round is being called
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoundEvent {
    NumberCalled {
        round_id: u64,
        call: Call,
        called_count: usize,
    },
    Finished {
        round_id: u64,
        winner: Option<PlayerId>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_formatting() {
        assert_eq!(Call::new(7).map(|c| c.to_string()), Some("B-7".to_string()));
        assert_eq!(Call::new(16).map(|c| c.to_string()), Some("I-16".to_string()));
        assert_eq!(Call::new(45).map(|c| c.to_string()), Some("N-45".to_string()));
        assert_eq!(Call::new(60).map(|c| c.to_string()), Some("G-60".to_string()));
        assert_eq!(Call::new(75).map(|c| c.to_string()), Some("O-75".to_string()));
        assert!(Call::new(0).is_none());
        assert!(Call::new(76).is_none());
    }

    #[test]
    fn test_column_ranges() {
        assert_eq!(Column::B.range(), 1..=15);
        assert_eq!(Column::I.range(), 16..=30);
        assert_eq!(Column::N.range(), 31..=45);
        assert_eq!(Column::G.range(), 46..=60);
        assert_eq!(Column::O.range(), 61..=75);
    }

    #[test]
    fn test_status_ordering_follows_lifecycle() {
        assert!(RoundStatus::Waiting < RoundStatus::Active);
        assert!(RoundStatus::Active < RoundStatus::Finished);
    }

    #[test]
    fn test_win_reason_strings() {
        assert_eq!(WinReason::Row.to_string(), "row");
        assert_eq!(WinReason::KeepPlaying.to_string(), "keep playing");
        assert_eq!(
            WinReason::InvalidMarkedNumbers.to_string(),
            "invalid marked numbers"
        );
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = RoundEvent::Finished {
            round_id: 9,
            winner: Some(42),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["event"], "finished");
        assert_eq!(json["winner"], 42);
    }
}
