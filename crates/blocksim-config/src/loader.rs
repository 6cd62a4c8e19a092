//! Configuration loader with multi-source merging

use crate::{BlocksimConfig, Paths};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    env_vars: Option<HashMap<String, String>>,
    user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "BLOCKSIM".to_string(),
            env_vars: None,
            user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "BLOCKSIM")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read environment overrides from `vars` instead of the process environment
    pub fn with_env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.env_vars = Some(vars);
        self
    }

    /// Skip ~/.config/blocksim/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<BlocksimConfig> {
        let mut builder = config::Config::builder();

        // 1. Built-in defaults
        let defaults = BlocksimConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/blocksim/config.toml)
        if self.user_config {
            if let Ok(user_config_file) = Paths::new().user_config_file() {
                if user_config_file.exists() {
                    builder = builder.add_source(
                        config::File::from(user_config_file)
                            .required(false)
                            .format(config::FileFormat::Toml),
                    );
                }
            }
        }

        // 3. Project config, then 4. local overrides
        for file in [
            Paths::project_config_file(&self.project_dir),
            Paths::local_config_file(&self.project_dir),
        ] {
            if file.exists() {
                builder = builder.add_source(
                    config::File::from(file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        // 5. Environment variables (BLOCKSIM_SIMULATION__NUM_BLOCKS=10)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env_vars.clone()),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let mut blocksim_config: BlocksimConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        blocksim_config.resolve_paths(&self.project_dir);
        blocksim_config.validate()?;

        Ok(blocksim_config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
