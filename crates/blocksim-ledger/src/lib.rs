//! # blocksim-ledger: a token ledger driven by blocksim
//!
//! A small in-memory ledger implementing [`blocksim::Application`]. Its
//! operations move funds between accounts, lock funds behind height or time
//! schedules, and audit that total supply never changes.
//!
//! ```ignore
//! let config = BlocksimConfig::load()?;
//! let mut ledger = Ledger::new(config.ledger.initial_balance);
//! let catalog = catalog(&config.ledger.weights);
//! let outcome = simulate_from_seed(&mut ledger, random_accounts, &catalog, &config.simulation_config(), &mut io::stdout())?;
//! ```

mod error;
mod ledger;
mod ops;

pub use error::LedgerError;
pub use ledger::{FEE_COLLECTOR, Ledger, SupplyCheckpoint, VESTING_POOL};
pub use ops::catalog;
