//! Simulation error types.

use thiserror::Error;

/// Boxed error returned by an operation body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

/// Errors that terminate a simulation run.
///
/// An external interrupt is not represented here: it ends the run through
/// [`crate::SimulationOutcome::stopped_early`] instead.
#[derive(Debug, Error)]
pub enum SimError {
    /// The run was misconfigured and never started a block.
    #[error("invalid simulation configuration: {0}")]
    Config(String),

    /// A primary block operation returned an error.
    #[error(
        "error on block {height}, operation {index} from {route}/{name}: {source}\nComment: {comment}"
    )]
    Operation {
        height: u64,
        index: usize,
        route: String,
        name: String,
        comment: String,
        #[source]
        source: BoxError,
    },

    /// A deferred operation drained from one of the queues returned an error.
    #[error("error on block {height}, queued operation from {route}/{name}: {source}\nComment: {comment}")]
    QueuedOperation {
        height: u64,
        route: String,
        name: String,
        comment: String,
        #[source]
        source: BoxError,
    },

    /// Writing a report or a log dump failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a report failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The OS signal listener could not be installed.
    #[error("failed to install signal listener: {0}")]
    Signal(String),
}

impl SimError {
    /// Returns true if this error came from an operation call.
    pub fn is_operation_error(&self) -> bool {
        matches!(
            self,
            SimError::Operation { .. } | SimError::QueuedOperation { .. }
        )
    }
}
