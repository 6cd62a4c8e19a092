//! blocksim command-line interface.
//!
//! Runs the bundled token ledger through randomized blocks.
//!
//! # Quick Start
//!
//! ```bash
//! # Run 100 blocks with a fixed seed
//! blocksim run --seed 7 --blocks 100
//!
//! # Show the merged configuration
//! blocksim config
//! ```

mod commands;
mod style;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::run::RunArgs;

/// blocksim - randomized block simulation for state machines.
#[derive(Parser)]
#[command(name = "blocksim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a ledger simulation.
    Run(RunArgs),

    /// Print the effective configuration as TOML.
    Config {
        /// Project directory holding blocksim.toml.
        #[arg(long)]
        project_dir: Option<String>,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays the simulation transcript
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    style::set_no_color(cli.no_color);

    match cli.command {
        Commands::Run(args) => commands::run::run(&args),
        Commands::Config { project_dir } => commands::config::show(project_dir.as_deref()),
    }
}
