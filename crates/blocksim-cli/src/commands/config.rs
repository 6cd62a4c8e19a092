//! Configuration commands.

use anyhow::{Context, Result};
use blocksim_config::ConfigLoader;

/// Prints the effective configuration for `project_dir` as TOML.
pub fn show(project_dir: Option<&str>) -> Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(dir) = project_dir {
        loader = loader.with_project_dir(dir);
    }
    let config = loader.load().context("Failed to load configuration")?;

    let text = config
        .to_toml()
        .context("Failed to render configuration")?;
    print!("{text}");
    Ok(())
}
