//! Block-size state machine.
//!
//! Consecutive blocks move between four load shapes through a weighted
//! Markov chain, so a run sees empty, trickling, partial and completely full
//! blocks without ever becoming periodic.
//!
//! | state     | size                      |
//! |-----------|---------------------------|
//! | `Heavy`   | uniform in `[0, max]`     |
//! | `Light`   | uniform in `[0, max / 4]` |
//! | `Full`    | `max`                     |
//! | `Trickle` | `min(1, max)`             |

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::rng::SimRng;

/// Which size distribution the last block was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlockSizeState {
    #[default]
    Heavy,
    Light,
    Full,
    Trickle,
}

impl BlockSizeState {
    /// All states, in matrix index order.
    pub const ALL: [BlockSizeState; 4] = [
        BlockSizeState::Heavy,
        BlockSizeState::Light,
        BlockSizeState::Full,
        BlockSizeState::Trickle,
    ];

    /// Index of this state in a [`TransitionMatrix`].
    pub fn index(self) -> usize {
        match self {
            BlockSizeState::Heavy => 0,
            BlockSizeState::Light => 1,
            BlockSizeState::Full => 2,
            BlockSizeState::Trickle => 3,
        }
    }

    /// Draws a block size for this state.
    pub fn sample(self, rng: &mut SimRng, max: usize) -> usize {
        match self {
            BlockSizeState::Heavy => rng.next_usize(max + 1),
            BlockSizeState::Light => rng.next_usize(max / 4 + 1),
            BlockSizeState::Full => max,
            BlockSizeState::Trickle => max.min(1),
        }
    }
}

// ============================================================================
// Transition Matrix
// ============================================================================

/// Integer-weighted transition matrix over [`BlockSizeState`].
///
/// `weights[from][to]` is the relative weight of moving from `from` to `to`.
/// Every row needs a positive total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTransitionMatrix")]
pub struct TransitionMatrix {
    weights: Vec<Vec<u32>>,
}

/// Unvalidated wire form of [`TransitionMatrix`].
#[derive(Deserialize)]
struct RawTransitionMatrix {
    weights: Vec<Vec<u32>>,
}

impl TryFrom<RawTransitionMatrix> for TransitionMatrix {
    type Error = SimError;

    fn try_from(raw: RawTransitionMatrix) -> Result<Self, Self::Error> {
        Self::new(raw.weights)
    }
}

impl TransitionMatrix {
    /// Creates a matrix, validating shape and row totals.
    pub fn new(weights: Vec<Vec<u32>>) -> Result<Self, SimError> {
        let n = BlockSizeState::ALL.len();
        if weights.len() != n {
            return Err(SimError::Config(format!(
                "block size transition matrix needs {n} rows, got {}",
                weights.len()
            )));
        }
        for (i, row) in weights.iter().enumerate() {
            if row.len() != n {
                return Err(SimError::Config(format!(
                    "block size transition matrix row {i} needs {n} columns, got {}",
                    row.len()
                )));
            }
            if row.iter().all(|w| *w == 0) {
                return Err(SimError::Config(format!(
                    "block size transition matrix row {i} has zero total weight"
                )));
            }
        }
        Ok(Self { weights })
    }

    /// Raw weights, one row per current state.
    pub fn rows(&self) -> &[Vec<u32>] {
        &self.weights
    }

    /// Draws the state following `current`.
    pub fn next_state(&self, rng: &mut SimRng, current: BlockSizeState) -> BlockSizeState {
        let row = &self.weights[current.index()];
        let total: u64 = row.iter().map(|w| u64::from(*w)).sum();
        let mut x = rng.int_between(0, total - 1);

        for (state, weight) in BlockSizeState::ALL.iter().zip(row) {
            let weight = u64::from(*weight);
            if x < weight {
                return *state;
            }
            x -= weight;
        }
        // Unreachable: x < total by construction.
        current
    }
}

impl Default for TransitionMatrix {
    fn default() -> Self {
        Self {
            weights: vec![
                vec![70, 15, 10, 5],
                vec![20, 60, 10, 10],
                vec![35, 20, 40, 5],
                vec![25, 25, 5, 45],
            ],
        }
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Computes the next block size and the state it was drawn from.
pub fn next_block_size(
    rng: &mut SimRng,
    transitions: &TransitionMatrix,
    state: BlockSizeState,
    max: usize,
) -> (BlockSizeState, usize) {
    let next = transitions.next_state(rng, state);
    (next, next.sample(rng, max))
}

/// Stateful wrapper remembering the last state across blocks.
#[derive(Debug, Clone)]
pub struct BlockSizeGenerator {
    transitions: TransitionMatrix,
    state: BlockSizeState,
}

impl BlockSizeGenerator {
    /// Creates a generator starting in [`BlockSizeState::Heavy`].
    pub fn new(transitions: TransitionMatrix) -> Self {
        Self {
            transitions,
            state: BlockSizeState::default(),
        }
    }

    /// Draws the size of the next block.
    pub fn next(&mut self, rng: &mut SimRng, max: usize) -> usize {
        let (state, size) = next_block_size(rng, &self.transitions, self.state, max);
        self.state = state;
        size
    }

    /// State used for the most recent block.
    pub fn state(&self) -> BlockSizeState {
        self.state
    }
}
