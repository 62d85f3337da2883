//! Number-drawing sources for rounds

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::VecDeque;

/// Picks the next number from the numbers not yet called
pub trait NumberDrawer: Send {
    /// `remaining` is never empty when called. Returning None or a number
    /// outside `remaining` makes the round pick uniformly instead.
    fn draw(&mut self, remaining: &[u8]) -> Option<u8>;
}

/// Uniform draw over the remaining numbers
pub struct RandomDrawer {
    rng: StdRng,
}

impl RandomDrawer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible draw order (simulations, tests)
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomDrawer {
    fn default() -> Self {
        Self::new()
    }
}

impl NumberDrawer for RandomDrawer {
    fn draw(&mut self, remaining: &[u8]) -> Option<u8> {
        remaining.choose(&mut self.rng).copied()
    }
}

/// Replays a fixed call sequence, e.g. a persisted call log. Once the script
/// runs out the round continues with uniform draws.
pub struct ScriptedDrawer {
    script: VecDeque<u8>,
}

impl ScriptedDrawer {
    pub fn new(script: impl IntoIterator<Item = u8>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    pub fn remaining_script(&self) -> usize {
        self.script.len()
    }
}

impl NumberDrawer for ScriptedDrawer {
    fn draw(&mut self, remaining: &[u8]) -> Option<u8> {
        let next = self.script.pop_front()?;
        remaining.contains(&next).then_some(next)
    }
}
