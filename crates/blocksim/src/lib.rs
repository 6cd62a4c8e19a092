//! # blocksim: Randomized Block Simulation for Chain Applications
//!
//! Drives a stateful chain application through many simulated blocks. Each
//! block runs a randomly sized batch of weighted, randomly selected
//! operations, and every random decision derives from one seed, so any
//! failure replays exactly from that seed.

#![allow(clippy::struct_excessive_bools)] // Run configuration is a set of switches
#![allow(clippy::uninlined_format_args)]
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Simulator::run                             │
//! │   SimParams::random ─> accounts ─> Application::init_chain        │
//! │                                                                    │
//! │  ┌──────────────────────────── per block ───────────────────────┐ │
//! │  │ BlockSizeGenerator ─> OperationSelector ─> SimRng::derive     │ │
//! │  │        │                                                       │ │
//! │  │        v                                                       │ │
//! │  │  execute slots ─> EventStats / LogWriter ─> HeightQueue       │ │
//! │  │                                          └─> TimeQueue        │ │
//! │  │  drain HeightQueue(h), TimeQueue(<= t)                        │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! │   commit ─> advance header ─> poll StopSignal                      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Model
//!
//! - Any operation error, primary or deferred, dumps the operation log and
//!   ends the run with [`SimError`].
//! - A panic inside an operation dumps the log in [`RunMode::Test`] and then
//!   keeps unwinding.
//! - SIGTERM, SIGQUIT or SIGINT stop the run at the next block boundary and
//!   yield [`SimulationOutcome::stopped_early`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use blocksim::{SimulationConfig, random_accounts, simulate_from_seed};
//!
//! let config = SimulationConfig::new(12345).with_num_blocks(50);
//! let outcome = simulate_from_seed(&mut app, random_accounts, &catalog, &config, &mut std::io::stdout())?;
//! println!("ran {} operations", outcome.op_count);
//! ```

pub mod block;
pub mod block_size;
mod chain;
mod error;
pub mod interrupt;
pub mod log_writer;
mod operation;
mod params;
pub mod queue;
mod rng;
mod selector;
pub mod simulate;
mod state;
pub mod stats;

pub use block::{BlockReport, BlockSimulator};
pub use block_size::{BlockSizeGenerator, BlockSizeState, TransitionMatrix, next_block_size};
pub use chain::{Account, BlockHeader, Validator, ValidatorSet, random_accounts};
pub use error::{BoxError, SimError, SimResult};
pub use interrupt::{Progress, SignalListener, StopSignal};
pub use log_writer::{
    DummyLogWriter, EntryKind, LogSink, LogWriter, OperationEntry, StandardLogWriter,
};
pub use operation::{
    FutureOperation, Operation, OperationError, OperationOutput, OperationResult,
    OperationReturn, Schedule, WeightedOperation, operation,
};
pub use params::{MAX_NUM_KEYS, MIN_NUM_KEYS, SimParams};
pub use queue::{HeightQueue, TimeQueue};
pub use rng::SimRng;
pub use selector::OperationSelector;
pub use simulate::{
    Application, ChainInit, PanicDumpGuard, RunMode, SimulationConfig, SimulationOutcome,
    Simulator, simulate_from_seed,
};
pub use state::SimState;
pub use stats::{EventOutcome, EventStats, EventTable};
