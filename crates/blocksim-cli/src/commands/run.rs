//! Ledger simulation command.

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use blocksim::{RunMode, SimulationOutcome, Simulator, random_accounts};
use blocksim_config::{BlocksimConfig, ConfigLoader};
use blocksim_ledger::{Ledger, catalog};
use clap::Args;

use crate::style::SemanticStyle;

/// Flags that override the loaded configuration for one run.
#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Seed of the run (reproduces a previous run exactly).
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Number of blocks to simulate.
    #[arg(short, long)]
    pub blocks: Option<u64>,

    /// Upper bound on operations per block.
    #[arg(long)]
    pub max_block_size: Option<usize>,

    /// Only log successful operations.
    #[arg(long)]
    pub lean: bool,

    /// Commit after every block (true/false).
    #[arg(long)]
    pub commit: Option<bool>,

    /// Write operation statistics to this JSON file.
    #[arg(long)]
    pub stats: Option<PathBuf>,

    /// Write the params snapshot to this JSON file.
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Height at which to take the params snapshot (0 = genesis).
    #[arg(long)]
    pub params_height: Option<u64>,

    /// Directory for operation log dumps.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Discard operation logs and progress output.
    #[arg(long)]
    pub benchmark: bool,

    /// Project directory holding blocksim.toml.
    #[arg(long)]
    pub project_dir: Option<PathBuf>,
}

impl RunArgs {
    fn apply(&self, config: &mut BlocksimConfig) {
        let sim = &mut config.simulation;
        if let Some(seed) = self.seed {
            sim.seed = seed;
        }
        if let Some(blocks) = self.blocks {
            sim.num_blocks = blocks;
        }
        if let Some(size) = self.max_block_size {
            sim.max_block_size = size;
        }
        if self.lean {
            sim.lean = true;
        }
        if let Some(commit) = self.commit {
            sim.commit = commit;
        }
        if let Some(height) = self.params_height {
            sim.export_params_height = height;
        }
        if let Some(stats) = &self.stats {
            config.output.stats_path = Some(stats.clone());
        }
        if let Some(params) = &self.params {
            config.output.params_path = Some(params.clone());
        }
        if let Some(dir) = &self.log_dir {
            config.output.log_dir.clone_from(dir);
        }
    }
}

/// Runs the ledger simulation.
pub fn run(args: &RunArgs) -> Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(dir) = &args.project_dir {
        loader = loader.with_project_dir(dir);
    }
    let mut config = loader.load().context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate()?;

    let seed = config.simulation.seed;
    let mut sim_config = config.simulation_config().with_signal_listener(true);
    if args.benchmark {
        sim_config = sim_config.with_mode(RunMode::Benchmark);
    }
    if let Some(dir) = &sim_config.log_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }

    let mut ledger = Ledger::new(config.ledger.initial_balance);
    let ops = catalog(&config.ledger.weights);

    let result = Simulator::new(sim_config, &ops)
        .and_then(|sim| sim.run(&mut ledger, random_accounts, &mut io::stdout()));

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!();
            eprintln!("{} {err}", "✗".error());
            eprintln!(
                "  Reproduce with: {}",
                format!("blocksim run --seed {seed}").code()
            );
            anyhow::bail!("simulation failed with seed {seed}");
        }
    };

    if let (Some(path), Some(params)) = (&config.output.params_path, &outcome.exported_params) {
        let json = serde_json::to_string_pretty(params)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write params to {}", path.display()))?;
        println!("  Params: {}", path.display().to_string().code());
    }

    summarize(&outcome, seed);
    Ok(())
}

fn summarize(outcome: &SimulationOutcome, seed: u64) {
    println!();
    if outcome.stopped_early {
        println!(
            "{} Stopped after {} blocks",
            "⚠".warning(),
            outcome.blocks_run
        );
        println!(
            "  Resume with: {}",
            format!("blocksim run --seed {seed}").code()
        );
    } else {
        println!(
            "{} Simulated {} blocks, {} operations",
            "✓".success(),
            outcome.blocks_run,
            outcome.op_count
        );
    }
    println!(
        "  {}",
        format!("final height {}, seed {seed}", outcome.final_height).muted()
    );
}
