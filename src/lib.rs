//! Bingo round engine
//!
//! In-memory engine for 75-ball bingo rounds: cartela boards, number calling,
//! marking, win detection and the Waiting -> Active -> Finished lifecycle.
//! Transport layers (chat bot, web view) map their users to player ids, hold
//! rounds in a [`RoundRegistry`] and relay calls and win checks to clients.

pub mod common;
pub mod errors;
pub mod games;

pub use common::config::{ConfigBuilder, ConfigLoader, EngineConfig, RoundConfig, SimulationConfig};
pub use errors::{EngineError, EngineResult};
pub use games::{
    Board, Call, GameOutcome, MarkRejection, PlayerId, Round, RoundEvent, RoundOutcome,
    RoundRegistry, RoundSnapshot, RoundStatus, WinCheck, WinReason,
};
