//! Configuration management for blocksim
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence, applied by the caller)
//! 2. Environment variables (BLOCKSIM_* prefix, `__` between keys)
//! 3. blocksim.local.toml (gitignored, local overrides)
//! 4. blocksim.toml (git-tracked, project config)
//! 5. ~/.config/blocksim/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)

use anyhow::Result;
use blocksim::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main blocksim configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlocksimConfig {
    pub simulation: SimulationSection,
    pub output: OutputConfig,
    pub ledger: LedgerConfig,
}

/// `[simulation]`: shape of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub seed: u64,
    pub num_blocks: u64,
    pub initial_height: u64,
    pub max_block_size: usize,
    pub commit: bool,
    pub lean: bool,
    pub export_params_height: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: 42,
            num_blocks: 500,
            initial_height: 1,
            max_block_size: 200,
            commit: true,
            lean: false,
            export_params_height: 0,
        }
    }
}

/// `[output]`: where reports and log dumps go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params_path: Option<PathBuf>,
    pub log_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            stats_path: None,
            params_path: None,
            log_dir: Paths::state_dir("").join("logs"),
        }
    }
}

/// `[ledger]`: demo application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub initial_balance: u64,
    pub weights: OperationWeights,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_balance: 1_000_000,
            weights: OperationWeights::default(),
        }
    }
}

/// `[ledger.weights]`: relative selection weight per ledger operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationWeights {
    pub send: u32,
    pub lock_until_height: u32,
    pub vest_after: u32,
    pub audit_supply: u32,
}

impl OperationWeights {
    pub fn total(&self) -> u64 {
        [
            self.send,
            self.lock_until_height,
            self.vest_after,
            self.audit_supply,
        ]
        .iter()
        .map(|w| u64::from(*w))
        .sum()
    }
}

impl Default for OperationWeights {
    fn default() -> Self {
        Self {
            send: 100,
            lock_until_height: 20,
            vest_after: 20,
            audit_supply: 5,
        }
    }
}

impl BlocksimConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Reject configurations that cannot produce a meaningful run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.num_blocks == 0 {
            return Err(ConfigError::ValidationError(
                "simulation.num_blocks must be greater than zero".to_string(),
            ));
        }
        if self.ledger.weights.total() == 0 {
            return Err(ConfigError::ValidationError(
                "ledger.weights must contain at least one non-zero weight".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        for path in [&mut self.output.stats_path, &mut self.output.params_path]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }

        if self.output.log_dir.is_relative() {
            self.output.log_dir = base.join(&self.output.log_dir);
        }
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Driver configuration for this run
    pub fn simulation_config(&self) -> SimulationConfig {
        let sim = &self.simulation;
        let mut config = SimulationConfig::new(sim.seed)
            .with_num_blocks(sim.num_blocks)
            .with_initial_height(sim.initial_height)
            .with_max_block_size(sim.max_block_size)
            .with_commit(sim.commit)
            .with_lean(sim.lean)
            .with_log_dir(&self.output.log_dir);
        if let Some(stats) = &self.output.stats_path {
            config = config.with_export_stats_path(stats);
        }
        if let Some(params) = &self.output.params_path {
            config = config.with_export_params(params, sim.export_params_height);
        }
        config
    }
}
