//! Ledger error types.

use thiserror::Error;

/// Errors raised by ledger state transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Account does not hold enough funds.
    #[error("insufficient funds in {address}: needed {needed}, available {available}")]
    InsufficientFunds {
        address: String,
        needed: u64,
        available: u64,
    },

    /// Total supply drifted from genesis.
    #[error("total supply changed: expected {expected}, found {actual}")]
    SupplyMismatch { expected: u64, actual: u64 },

    /// Crediting would overflow a balance.
    #[error("balance overflow in {0}")]
    Overflow(String),
}
