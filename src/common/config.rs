//! Configuration management for the bingo engine
//!
//! Defaults, TOML loading, environment variable overrides and validation.

use crate::errors::{EngineError, EngineResult};
use crate::games::board::CARTELA_COUNT;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Entry prices offered by the lobby
pub const DEFAULT_ENTRY_PRICES: [u32; 4] = [10, 20, 50, 100];

/// Top-level engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub rounds: RoundConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Limits applied to every new round
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundConfig {
    /// Roster size that auto-starts a waiting round
    pub min_players: usize,
    pub max_players: usize,
    pub entry_prices: Vec<u32>,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            min_players: 1,
            max_players: CARTELA_COUNT as usize,
            entry_prices: DEFAULT_ENTRY_PRICES.to_vec(),
        }
    }
}

impl RoundConfig {
    pub fn accepts_entry_price(&self, entry_price: u32) -> bool {
        self.entry_prices.contains(&entry_price)
    }
}

/// Auto-caller settings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationConfig {
    pub call_interval_ms: u64,
    /// Capacity of the round event broadcast channel
    pub event_buffer: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            call_interval_ms: 50,
            event_buffer: 256,
        }
    }
}

impl SimulationConfig {
    pub fn call_interval(&self) -> Duration {
        Duration::from_millis(self.call_interval_ms)
    }
}

impl EngineConfig {
    /// Validate configuration values
    pub fn validate(&self) -> EngineResult<()> {
        let rounds = &self.rounds;

        if rounds.min_players == 0 {
            return Err(invalid("rounds.min_players", "0", "Must be at least 1"));
        }

        if rounds.max_players < rounds.min_players {
            return Err(invalid(
                "rounds.max_players",
                &rounds.max_players.to_string(),
                "Cannot be below min_players",
            ));
        }

        // Every seat needs its own cartela
        if rounds.max_players > CARTELA_COUNT as usize {
            return Err(invalid(
                "rounds.max_players",
                &rounds.max_players.to_string(),
                "Cannot exceed the number of cartelas (100)",
            ));
        }

        if rounds.entry_prices.is_empty() {
            return Err(invalid("rounds.entry_prices", "[]", "At least one price is required"));
        }

        if rounds.entry_prices.contains(&0) {
            return Err(invalid("rounds.entry_prices", "0", "Prices must be positive"));
        }

        let mut sorted = rounds.entry_prices.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != rounds.entry_prices.len() {
            return Err(invalid(
                "rounds.entry_prices",
                &format!("{:?}", rounds.entry_prices),
                "Prices must be unique",
            ));
        }

        if self.simulation.event_buffer == 0 {
            return Err(invalid("simulation.event_buffer", "0", "Buffer cannot be zero"));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> EngineError {
    EngineError::InvalidConfiguration {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> EngineResult<EngineConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            EngineConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> EngineResult<EngineConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::ConfigLoad(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| EngineError::ConfigLoad(format!("Failed to parse TOML: {}", e)))
    }

    fn apply_env_overrides(&self, config: &mut EngineConfig) -> EngineResult<()> {
        if let Ok(value) = env::var("BINGO_MIN_PLAYERS") {
            config.rounds.min_players = parse_env("BINGO_MIN_PLAYERS", &value)?;
        }
        if let Ok(value) = env::var("BINGO_MAX_PLAYERS") {
            config.rounds.max_players = parse_env("BINGO_MAX_PLAYERS", &value)?;
        }
        if let Ok(value) = env::var("BINGO_ENTRY_PRICES") {
            config.rounds.entry_prices = value
                .split(',')
                .map(|p| parse_env("BINGO_ENTRY_PRICES", p.trim()))
                .collect::<EngineResult<Vec<u32>>>()?;
        }
        if let Ok(value) = env::var("BINGO_CALL_INTERVAL_MS") {
            config.simulation.call_interval_ms = parse_env("BINGO_CALL_INTERVAL_MS", &value)?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &EngineConfig, path: &str) -> EngineResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| EngineError::ConfigSave(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| EngineError::ConfigSave(format!("Failed to write to {}: {}", path, e)))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: &str) -> EngineResult<T> {
    value.parse().map_err(|_| EngineError::InvalidConfiguration {
        field: field.to_string(),
        value: value.to_string(),
        reason: "Invalid number".to_string(),
    })
}

/// Builder pattern for creating configurations
pub struct ConfigBuilder {
    config: EngineConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn min_players(mut self, min_players: usize) -> Self {
        self.config.rounds.min_players = min_players;
        self
    }

    pub fn max_players(mut self, max_players: usize) -> Self {
        self.config.rounds.max_players = max_players;
        self
    }

    pub fn entry_prices(mut self, entry_prices: Vec<u32>) -> Self {
        self.config.rounds.entry_prices = entry_prices;
        self
    }

    pub fn call_interval_ms(mut self, call_interval_ms: u64) -> Self {
        self.config.simulation.call_interval_ms = call_interval_ms;
        self
    }

    /// Build and validate the final configuration
    pub fn build(self) -> EngineResult<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
