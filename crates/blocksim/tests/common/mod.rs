//! Shared fixtures for simulation scenario tests.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use blocksim::{
    Account, Application, BlockHeader, ChainInit, LogWriter, OperationEntry, OperationOutput,
    OperationResult, SimError, SimParams, SimRng, SimulationConfig, StopSignal, Validator,
    WeightedOperation, operation,
};
use chrono::{TimeZone, Utc};
use rand::RngCore;

/// Address prefix of accounts the test app blocks.
pub const MODULE_PREFIX: &str = "module";

/// Application recording every call the driver makes.
#[derive(Default)]
pub struct TestApp {
    /// (height, operation name, first random draw)
    pub trace: Vec<(u64, String, u64)>,
    pub begun: Vec<u64>,
    pub ended: Vec<u64>,
    pub commits: u64,
    pub saw_blocked_account: bool,
    pub no_validators: bool,
    /// Block every account, module or not.
    pub block_all: bool,
    /// Trigger `stop` at the end of this height.
    pub stop_at: Option<(u64, StopSignal)>,
}

impl Application for TestApp {
    fn init_chain(
        &mut self,
        _rng: &mut SimRng,
        _params: &SimParams,
        accounts: &[Account],
        _config: &SimulationConfig,
    ) -> Result<ChainInit, SimError> {
        let validators = if self.no_validators {
            Vec::new()
        } else {
            vec![
                Validator {
                    address: "val-a".to_string(),
                    power: 10,
                },
                Validator {
                    address: "val-b".to_string(),
                    power: 20,
                },
            ]
        };

        let mut accounts = accounts.to_vec();
        accounts.push(Account {
            address: format!("{MODULE_PREFIX}-fees"),
            key_seed: 0,
        });

        Ok(ChainInit {
            validators,
            genesis_time: Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
            accounts,
            chain_id: "test-chain".to_string(),
        })
    }

    fn commit(&mut self) {
        self.commits += 1;
    }

    fn begin_block(&mut self, header: &BlockHeader) {
        self.begun.push(header.height);
    }

    fn end_block(&mut self, header: &BlockHeader) {
        self.ended.push(header.height);
        if let Some((height, stop)) = &self.stop_at {
            if *height == header.height {
                stop.trigger(format!("stop requested at block {height}"));
            }
        }
    }

    fn is_blocked(&self, account: &Account) -> bool {
        self.block_all || account.address.starts_with(MODULE_PREFIX)
    }
}

/// Operation that records its height, name and first random draw.
pub fn traced(name: &'static str, weight: u32) -> WeightedOperation<TestApp> {
    WeightedOperation::new(
        name,
        weight,
        operation(move |rng: &mut SimRng, app: &mut TestApp, header, accounts, _| {
            app.trace.push((header.height, name.to_string(), rng.next_u64()));
            app.saw_blocked_account |= accounts
                .iter()
                .any(|a| a.address.starts_with(MODULE_PREFIX));
            Ok(OperationOutput::new(OperationResult::ok("test", name, "")))
        }),
    )
}

/// Small, fast run configuration.
pub fn config(seed: u64) -> SimulationConfig {
    SimulationConfig::new(seed)
        .with_num_blocks(20)
        .with_max_block_size(15)
}

/// Few accounts regardless of the randomized key count.
pub fn few_accounts(rng: &mut SimRng, n: usize) -> Vec<Account> {
    blocksim::random_accounts(rng, n.min(8))
}

/// Log writer sharing its entries and dump count with the test.
#[derive(Clone, Default)]
pub struct RecordingLog {
    pub entries: Arc<Mutex<Vec<OperationEntry>>>,
    pub dumps: Arc<Mutex<usize>>,
}

impl RecordingLog {
    pub fn entries(&self) -> Vec<OperationEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn dumps(&self) -> usize {
        *self.dumps.lock().unwrap()
    }
}

impl LogWriter for RecordingLog {
    fn add_entry(&mut self, entry: OperationEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    fn print_logs(&mut self) -> io::Result<()> {
        *self.dumps.lock().unwrap() += 1;
        Ok(())
    }
}

/// `Write` handle over a shared buffer.
#[derive(Clone, Default)]
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
