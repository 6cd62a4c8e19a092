//! Randomized simulation parameters.

use serde::{Deserialize, Serialize};

use crate::block_size::TransitionMatrix;
use crate::rng::SimRng;

/// Smallest number of accounts a randomized run creates.
pub const MIN_NUM_KEYS: usize = 2;

/// Largest number of accounts a randomized run creates.
pub const MAX_NUM_KEYS: usize = 2500;

/// Parameters drawn once per run from the top-level random source.
///
/// They are printed at run start and can be exported so a run's shape can be
/// inspected without replaying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimParams {
    /// Number of accounts to generate.
    pub num_keys: usize,

    /// Lower bound of the time a block advances the clock by, in seconds.
    pub min_time_per_block_secs: u64,

    /// Upper bound of the time a block advances the clock by, in seconds.
    pub max_time_per_block_secs: u64,

    /// Block-size state transitions.
    pub block_size_transitions: TransitionMatrix,
}

impl SimParams {
    /// Draws a random parameter set.
    pub fn random(rng: &mut SimRng) -> Self {
        let num_keys = rng.int_between(MIN_NUM_KEYS as u64, MAX_NUM_KEYS as u64) as usize;
        let min_time_per_block_secs = rng.int_between(1, 10);
        let max_time_per_block_secs = min_time_per_block_secs + rng.int_between(0, 60);

        let base = TransitionMatrix::default();
        let weights: Vec<Vec<u32>> = base
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|w| w * rng.int_between(1, 3) as u32)
                    .collect()
            })
            .collect();
        // Scaling a valid row by positive factors keeps it valid.
        let block_size_transitions = TransitionMatrix::new(weights).unwrap_or(base);

        Self {
            num_keys,
            min_time_per_block_secs,
            max_time_per_block_secs,
            block_size_transitions,
        }
    }

    /// Draws the number of seconds the next block advances the clock by.
    pub fn block_time_delta(&self, rng: &mut SimRng) -> u64 {
        rng.int_between(self.min_time_per_block_secs, self.max_time_per_block_secs)
    }
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            num_keys: 10,
            min_time_per_block_secs: 5,
            max_time_per_block_secs: 5,
            block_size_transitions: TransitionMatrix::default(),
        }
    }
}
