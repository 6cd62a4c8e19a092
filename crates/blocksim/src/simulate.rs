//! Top-level simulation driver.
//!
//! # Usage
//!
//! ```ignore
//! let config = SimulationConfig::new(42).with_num_blocks(100).with_max_block_size(50);
//! let outcome = Simulator::new(config, &catalog)?.run(&mut app, random_accounts, &mut io::stdout())?;
//! assert!(!outcome.stopped_early);
//! ```

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::block::BlockSimulator;
use crate::chain::{Account, BlockHeader, Validator, ValidatorSet};
use crate::error::SimError;
use crate::interrupt::{Progress, SignalListener, StopSignal};
use crate::log_writer::{DummyLogWriter, LogSink, LogWriter, OperationEntry, StandardLogWriter};
use crate::operation::WeightedOperation;
use crate::params::SimParams;
use crate::rng::SimRng;
use crate::selector::OperationSelector;
use crate::state::SimState;
use crate::stats::EventStats;

// ============================================================================
// Configuration
// ============================================================================

/// How the run is being driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Test harness: logs are kept, progress is printed and panics dump logs.
    #[default]
    Test,
    /// Benchmark: logging is discarded and panics propagate untouched.
    Benchmark,
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed of the top-level random source.
    pub seed: u64,
    /// Number of blocks to simulate.
    pub num_blocks: u64,
    /// Height of the first block. Zero means 1.
    pub initial_height: u64,
    /// Upper bound on primary operations per block.
    pub max_block_size: usize,
    /// Call [`Application::commit`] after every block.
    pub commit: bool,
    /// Only log successful operations.
    pub lean: bool,
    /// Where to write the statistics report.
    pub export_stats_path: Option<PathBuf>,
    /// Enables the params snapshot. The driver never writes this file itself.
    pub export_params_path: Option<PathBuf>,
    /// Height at which params are snapshotted. Zero snapshots at genesis.
    pub export_params_height: u64,
    /// Directory for log dumps. Dumps go to stderr when unset.
    pub log_dir: Option<PathBuf>,
    /// Listen for SIGTERM, SIGQUIT and SIGINT (Ctrl-C on windows).
    pub install_signal_listener: bool,
    /// Test or benchmark.
    pub mode: RunMode,
}

impl SimulationConfig {
    /// Creates a configuration with the given seed and defaults elsewhere.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn with_num_blocks(mut self, num_blocks: u64) -> Self {
        self.num_blocks = num_blocks;
        self
    }

    pub fn with_initial_height(mut self, height: u64) -> Self {
        self.initial_height = height;
        self
    }

    pub fn with_max_block_size(mut self, max_block_size: usize) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    pub fn with_commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }

    pub fn with_lean(mut self, lean: bool) -> Self {
        self.lean = lean;
        self
    }

    pub fn with_export_stats_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.export_stats_path = Some(path.into());
        self
    }

    /// Enables the params snapshot at `height`.
    pub fn with_export_params(mut self, path: impl Into<PathBuf>, height: u64) -> Self {
        self.export_params_path = Some(path.into());
        self.export_params_height = height;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn with_signal_listener(mut self, install: bool) -> Self {
        self.install_signal_listener = install;
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Height of the first simulated block.
    pub fn first_height(&self) -> u64 {
        self.initial_height.max(1)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_blocks: 500,
            initial_height: 1,
            max_block_size: 200,
            commit: true,
            lean: false,
            export_stats_path: None,
            export_params_path: None,
            export_params_height: 0,
            log_dir: None,
            install_signal_listener: false,
            mode: RunMode::Test,
        }
    }
}

// ============================================================================
// Application
// ============================================================================

/// What chain initialization hands back to the driver.
#[derive(Debug, Clone)]
pub struct ChainInit {
    /// Initial validator set. Must not be empty.
    pub validators: Vec<Validator>,
    /// Timestamp of the first block.
    pub genesis_time: DateTime<Utc>,
    /// Accounts operations may act on.
    pub accounts: Vec<Account>,
    /// Chain identifier.
    pub chain_id: String,
}

/// The application under test.
pub trait Application {
    /// Initializes the chain from the generated accounts.
    fn init_chain(
        &mut self,
        rng: &mut SimRng,
        params: &SimParams,
        accounts: &[Account],
        config: &SimulationConfig,
    ) -> Result<ChainInit, SimError>;

    /// Commits the current block.
    fn commit(&mut self);

    /// Called before a block's operations run.
    fn begin_block(&mut self, _header: &BlockHeader) {}

    /// Called after a block's operations, including deferred ones, ran.
    fn end_block(&mut self, _header: &BlockHeader) {}

    /// Accounts operations must never see, such as module accounts.
    fn is_blocked(&self, _account: &Account) -> bool {
        false
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of a run that ended without an operation error.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    /// An external stop request ended the run before `num_blocks` blocks.
    pub stopped_early: bool,
    /// Why the run stopped early.
    pub stop_reason: Option<String>,
    /// Params snapshot, when enabled and the configured height was reached.
    pub exported_params: Option<SimParams>,
    /// Params drawn at run start.
    pub params: SimParams,
    /// Number of blocks simulated.
    pub blocks_run: u64,
    /// Header height at loop exit, one past the last simulated block.
    pub final_height: u64,
    /// Header time at loop exit.
    pub final_time: DateTime<Utc>,
    /// Operations run, primary and deferred.
    pub op_count: u64,
    /// Outcome tally.
    pub event_stats: EventStats,
}

// ============================================================================
// Panic Guard
// ============================================================================

/// Dumps the operation log if a panic unwinds through the block loop.
///
/// The panic is not caught; it keeps unwinding after the dump.
pub struct PanicDumpGuard<'a, A> {
    state: &'a mut SimState<A>,
    w: &'a mut dyn Write,
    armed: bool,
}

impl<'a, A> PanicDumpGuard<'a, A> {
    /// Wraps `state` for the duration of the block loop. A disarmed guard
    /// does nothing on panic.
    pub fn new(state: &'a mut SimState<A>, w: &'a mut dyn Write, armed: bool) -> Self {
        Self { state, w, armed }
    }

    /// Borrows the guarded state and output.
    pub fn parts(&mut self) -> (&mut SimState<A>, &mut dyn Write) {
        (&mut *self.state, &mut *self.w)
    }
}

impl<A> Drop for PanicDumpGuard<'_, A> {
    fn drop(&mut self) {
        if !self.armed || !std::thread::panicking() {
            return;
        }
        let height = self.state.header.height;
        let _ = writeln!(self.w, "simulation halted due to panic on block {height}");
        tracing::error!(height, "simulation halted due to panic");
        self.state.dump_logs();
    }
}

// ============================================================================
// Simulator
// ============================================================================

/// Drives an [`Application`] through randomized blocks.
pub struct Simulator<A> {
    config: SimulationConfig,
    selector: OperationSelector<A>,
    log_writer: Option<Box<dyn LogWriter>>,
    stop: StopSignal,
}

impl<A: Application> Simulator<A> {
    /// Creates a simulator. Fails if the catalog cannot be selected from.
    pub fn new(config: SimulationConfig, catalog: &[WeightedOperation<A>]) -> Result<Self, SimError> {
        Ok(Self {
            config,
            selector: OperationSelector::new(catalog)?,
            log_writer: None,
            stop: StopSignal::new(),
        })
    }

    /// Replaces the log writer the run mode would pick.
    pub fn with_log_writer(mut self, log_writer: Box<dyn LogWriter>) -> Self {
        self.log_writer = Some(log_writer);
        self
    }

    /// Handle that stops the run at the next block boundary.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn default_log_writer(&self) -> Box<dyn LogWriter> {
        match (self.config.mode, &self.config.log_dir) {
            (RunMode::Benchmark, _) => Box::new(DummyLogWriter),
            (RunMode::Test, Some(dir)) => {
                Box::new(StandardLogWriter::new(LogSink::Directory(dir.clone())))
            }
            (RunMode::Test, None) => Box::new(StandardLogWriter::new(LogSink::Stderr)),
        }
    }

    /// Runs the simulation.
    ///
    /// `random_accounts` generates the requested number of accounts from the
    /// top-level random source. Human-readable progress goes to `w`.
    pub fn run<F>(
        mut self,
        app: &mut A,
        random_accounts: F,
        w: &mut dyn Write,
    ) -> Result<SimulationOutcome, SimError>
    where
        F: FnOnce(&mut SimRng, usize) -> Vec<Account>,
    {
        let config = self.config.clone();
        let testing = config.mode == RunMode::Test;

        tracing::info!(
            seed = config.seed,
            num_blocks = config.num_blocks,
            max_block_size = config.max_block_size,
            "starting simulation"
        );
        writeln!(
            w,
            "Starting simulation with randomness created with seed {}",
            config.seed
        )?;

        let mut rng = SimRng::new(config.seed);
        let params = SimParams::random(&mut rng);
        writeln!(
            w,
            "Randomized simulation params:\n{}",
            serde_json::to_string_pretty(&params)?
        )?;

        let accounts = random_accounts(&mut rng, params.num_keys);
        if accounts.is_empty() {
            return Err(SimError::Config(
                "must have greater than zero genesis accounts".to_string(),
            ));
        }

        let init = app.init_chain(&mut rng, &params, &accounts, &config)?;
        if init.validators.is_empty() {
            return Err(SimError::Config(
                "chain initialization returned no validators".to_string(),
            ));
        }
        let accounts: Vec<Account> = init
            .accounts
            .into_iter()
            .filter(|account| !app.is_blocked(account))
            .collect();
        if accounts.is_empty() {
            return Err(SimError::Config(
                "no eligible accounts left after chain initialization".to_string(),
            ));
        }

        writeln!(
            w,
            "Starting the simulation from time {} (unixtime {})",
            init.genesis_time.format("%a %b %e %H:%M:%S UTC %Y"),
            init.genesis_time.timestamp()
        )?;

        let validators = ValidatorSet::new(init.validators);
        let proposer = validators
            .random_proposer(&mut rng)
            .map(|v| v.address.clone())
            .unwrap_or_default();
        let first_height = config.first_height();
        let header = BlockHeader {
            chain_id: init.chain_id,
            height: first_height,
            time: init.genesis_time,
            proposer,
        };

        let log_writer = match self.log_writer.take() {
            Some(log_writer) => log_writer,
            None => self.default_log_writer(),
        };
        let mut state = SimState::new(header, params.clone(), validators, log_writer, config.lean);

        let progress = Progress::new();
        progress.publish(first_height, 0);
        let _listener = if config.install_signal_listener {
            Some(SignalListener::install(self.stop.clone(), progress.clone())?)
        } else {
            None
        };

        let export_params = config.export_params_path.is_some();
        let mut exported_params = (export_params && config.export_params_height == 0)
            .then(|| params.clone());

        let block_sim = BlockSimulator::new(&self.selector, config.max_block_size, config.num_blocks)
            .with_progress(testing);
        let end_height = first_height.saturating_add(config.num_blocks);
        let mut blocks_run = 0;

        {
            let mut guard = PanicDumpGuard::new(&mut state, &mut *w, testing);
            loop {
                let (state, w) = guard.parts();
                if state.header.height >= end_height || self.stop.is_triggered() {
                    break;
                }

                let height = state.header.height;
                app.begin_block(&state.header);
                state.log_writer.add_entry(OperationEntry::begin_block(height));

                let report = block_sim.simulate_block(&mut rng, app, state, &accounts, w)?;
                state.op_count += report.total() as u64;

                app.end_block(&state.header);
                state.log_writer.add_entry(OperationEntry::end_block(height));

                if config.commit {
                    app.commit();
                }

                if export_params && exported_params.is_none() && config.export_params_height == height {
                    exported_params = Some(state.params.clone());
                }

                blocks_run += 1;
                state.advance_header(&mut rng);
                progress.publish(state.header.height, state.op_count);
            }
        }

        let stopped_early = self.stop.is_triggered();
        let stop_reason = self.stop.reason();
        if stopped_early {
            let reason = stop_reason.as_deref().unwrap_or("stop requested");
            writeln!(w, "\n{reason}")?;
            tracing::warn!(
                height = state.header.height,
                op_count = state.op_count,
                reason,
                "simulation stopped early"
            );
        } else {
            writeln!(
                w,
                "\nSimulation complete; Final height (blocks): {}, final time (seconds): {}, operations ran: {}",
                state.header.height,
                state.header.time.timestamp(),
                state.op_count
            )?;
            tracing::info!(
                height = state.header.height,
                op_count = state.op_count,
                "simulation complete"
            );
        }

        state
            .event_stats
            .export_events(config.export_stats_path.as_deref(), w)?;

        Ok(SimulationOutcome {
            stopped_early,
            stop_reason,
            exported_params,
            params,
            blocks_run,
            final_height: state.header.height,
            final_time: state.header.time,
            op_count: state.op_count,
            event_stats: state.event_stats,
        })
    }
}

/// Runs a simulation with a fresh [`Simulator`].
pub fn simulate_from_seed<A, F>(
    app: &mut A,
    random_accounts: F,
    catalog: &[WeightedOperation<A>],
    config: &SimulationConfig,
    w: &mut dyn Write,
) -> Result<SimulationOutcome, SimError>
where
    A: Application,
    F: FnOnce(&mut SimRng, usize) -> Vec<Account>,
{
    Simulator::new(config.clone(), catalog)?.run(app, random_accounts, w)
}
