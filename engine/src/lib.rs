//! Session engine for an LLM-narrated text adventure.
//!
//! The narration stream is free text; two bracketed markers embedded in it
//! (item pickup and combat start) drive a small deterministic inventory and
//! combat mini-game. [`api::GameEngine`] owns the single authoritative
//! [`session::Session`] and is the only mutation path offered to callers.

pub mod api;
pub mod combat;
pub mod content;
pub mod error;
pub mod inventory;
pub mod life;
pub mod markers;
pub mod narration;
pub mod persistence;
pub mod session;

pub use api::{EngineConfig, GameEngine};
pub use error::{EngineError, EngineResult};
pub use session::{Message, Role, Scenario, Session};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

enum DiceSource {
    Seeded(ChaCha8Rng),
    Scripted { rolls: Vec<u32>, next: usize },
}

/// Source of every random number the game uses.
pub struct Dice {
    source: DiceSource,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { source: DiceSource::Seeded(ChaCha8Rng::seed_from_u64(seed)) }
    }

    pub fn from_entropy() -> Self {
        Self { source: DiceSource::Seeded(ChaCha8Rng::from_entropy()) }
    }

    /// Replays `rolls` in order, cycling once exhausted. Each value is clamped
    /// into the range the caller asked for.
    pub fn from_scripted(rolls: Vec<u32>) -> Self {
        Self { source: DiceSource::Scripted { rolls, next: 0 } }
    }

    /// Uniform integer in `lo..=hi`.
    pub fn roll(&mut self, lo: u32, hi: u32) -> u32 {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        match &mut self.source {
            DiceSource::Seeded(rng) => rng.gen_range(lo..=hi),
            DiceSource::Scripted { rolls, next } => {
                if rolls.is_empty() {
                    return lo;
                }
                let value = rolls[*next % rolls.len()];
                *next += 1;
                value.clamp(lo, hi)
            }
        }
    }

    pub fn d20(&mut self) -> u32 {
        self.roll(1, 20)
    }

    pub fn percentile(&mut self) -> u32 {
        self.roll(1, 100)
    }
}
