//! Ledger state and its chain lifecycle.

use std::collections::BTreeMap;

use blocksim::{
    Account, Application, BlockHeader, ChainInit, SimError, SimParams, SimRng, SimulationConfig,
    Validator,
};
use chrono::{DateTime, TimeZone, Utc};

use crate::error::LedgerError;

/// Module account collecting fees. Never handed to operations.
pub const FEE_COLLECTOR: &str = "module:fee_collector";

/// Module account holding locked and vesting funds. Never handed to operations.
pub const VESTING_POOL: &str = "module:vesting_pool";

/// Earliest genesis time a run can pick (2020-01-01T00:00:00Z).
const GENESIS_FLOOR_SECS: i64 = 1_577_836_800;

/// Span genesis times are drawn from.
const GENESIS_SPAN_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Supply observed at a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplyCheckpoint {
    pub height: u64,
    pub supply: u64,
}

/// In-memory token ledger.
///
/// Supply is minted once at genesis. Every later transition moves funds
/// between accounts, so total supply stays constant.
#[derive(Debug, Clone)]
pub struct Ledger {
    balances: BTreeMap<String, u64>,
    initial_balance: u64,
    genesis_supply: u64,
    current_height: u64,
    committed_height: u64,
    checkpoints: Vec<SupplyCheckpoint>,
}

impl Ledger {
    /// Creates an empty ledger that credits `initial_balance` to every
    /// genesis account.
    pub fn new(initial_balance: u64) -> Self {
        Self {
            balances: BTreeMap::new(),
            initial_balance,
            genesis_supply: 0,
            current_height: 0,
            committed_height: 0,
            checkpoints: Vec::new(),
        }
    }

    pub fn balance(&self, address: &str) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Sum of every balance, module accounts included.
    pub fn total_supply(&self) -> u64 {
        self.balances.values().sum()
    }

    pub fn genesis_supply(&self) -> u64 {
        self.genesis_supply
    }

    pub fn committed_height(&self) -> u64 {
        self.committed_height
    }

    pub fn checkpoints(&self) -> &[SupplyCheckpoint] {
        &self.checkpoints
    }

    /// Creates new tokens. Only genesis does this on a healthy ledger.
    pub fn mint(&mut self, address: &str, amount: u64) -> Result<(), LedgerError> {
        let balance = self.balances.entry(address.to_string()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(address.to_string()))?;
        Ok(())
    }

    /// Moves `amount` from `from` to `to`.
    pub fn transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<(), LedgerError> {
        let available = self.balance(from);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                address: from.to_string(),
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(to.to_string()))?;
        self.balances.insert(from.to_string(), available - amount);
        self.balances.insert(to.to_string(), credited);
        Ok(())
    }

    /// Checks that supply still equals genesis supply.
    pub fn audit(&self) -> Result<u64, LedgerError> {
        let actual = self.total_supply();
        if actual == self.genesis_supply {
            Ok(actual)
        } else {
            Err(LedgerError::SupplyMismatch {
                expected: self.genesis_supply,
                actual,
            })
        }
    }

    fn is_module_account(address: &str) -> bool {
        address.starts_with("module:")
    }
}

impl Application for Ledger {
    fn init_chain(
        &mut self,
        rng: &mut SimRng,
        _params: &SimParams,
        accounts: &[Account],
        _config: &SimulationConfig,
    ) -> Result<ChainInit, SimError> {
        let credit = |ledger: &mut Ledger, address: &str, amount: u64| {
            ledger
                .mint(address, amount)
                .map_err(|e| SimError::Config(format!("genesis failed: {e}")))
        };

        let initial_balance = self.initial_balance;
        for account in accounts {
            credit(self, &account.address, initial_balance)?;
        }
        credit(self, FEE_COLLECTOR, 0)?;
        credit(self, VESTING_POOL, 0)?;
        self.genesis_supply = self.total_supply();

        let validator_count = rng.int_between(1, 4);
        let validators = (0..validator_count)
            .map(|i| Validator {
                address: format!("simvaloper{i}{:08x}", rng.next_usize(1 << 30)),
                power: rng.int_between(1, 100),
            })
            .collect();

        let offset = rng.int_between(0, GENESIS_SPAN_SECS) as i64;
        let genesis_time: DateTime<Utc> = Utc
            .timestamp_opt(GENESIS_FLOOR_SECS + offset, 0)
            .single()
            .ok_or_else(|| SimError::Config("genesis time out of range".to_string()))?;

        let chain_id = format!("blocksim-ledger-{}", rng.int_between(1, 9999));

        let accounts: Vec<Account> = accounts
            .iter()
            .filter(|a| !self.is_blocked(a))
            .cloned()
            .collect();

        tracing::info!(
            accounts = accounts.len(),
            genesis_supply = self.genesis_supply,
            chain_id = %chain_id,
            "ledger genesis"
        );

        Ok(ChainInit {
            validators,
            genesis_time,
            accounts,
            chain_id,
        })
    }

    fn commit(&mut self) {
        self.committed_height = self.current_height;
        self.checkpoints.push(SupplyCheckpoint {
            height: self.current_height,
            supply: self.total_supply(),
        });
    }

    fn begin_block(&mut self, header: &BlockHeader) {
        self.current_height = header.height;
    }

    fn is_blocked(&self, account: &Account) -> bool {
        Self::is_module_account(&account.address)
    }
}
