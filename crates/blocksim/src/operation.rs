//! Operation capability and its result types.
//!
//! The core never enumerates operation kinds. An operation is any closure
//! with the fixed call shape
//! `(rng, app, header, accounts, chain_id) -> Result<OperationOutput, OperationError>`,
//! built by the application's catalog and wrapped with [`operation`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::{Account, BlockHeader};
use crate::error::BoxError;
use crate::rng::SimRng;
use crate::stats::{EventOutcome, EventStats};

// ============================================================================
// Operation
// ============================================================================

/// An opaque state-mutating action over application `A`.
pub type Operation<A> = Arc<
    dyn Fn(&mut SimRng, &mut A, &BlockHeader, &[Account], &str) -> OperationReturn<A>
        + Send
        + Sync,
>;

/// What an operation call returns.
pub type OperationReturn<A> = Result<OperationOutput<A>, OperationError>;

/// Wraps a closure as an [`Operation`].
pub fn operation<A, F>(f: F) -> Operation<A>
where
    F: Fn(&mut SimRng, &mut A, &BlockHeader, &[Account], &str) -> OperationReturn<A>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// An operation with its relative selection weight.
pub struct WeightedOperation<A> {
    /// Stable identity of the operation, used in logs and determinism checks.
    pub name: String,
    /// Relative weight. Zero-weight entries are never selected.
    pub weight: u32,
    /// The operation itself.
    pub op: Operation<A>,
}

impl<A> WeightedOperation<A> {
    /// Creates a weighted operation.
    pub fn new(name: impl Into<String>, weight: u32, op: Operation<A>) -> Self {
        Self {
            name: name.into(),
            weight,
            op,
        }
    }
}

impl<A> Clone for WeightedOperation<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            weight: self.weight,
            op: Arc::clone(&self.op),
        }
    }
}

impl<A> fmt::Debug for WeightedOperation<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedOperation")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome record of a single operation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Whether the operation did what it set out to do.
    ///
    /// `false` with no error is a legitimate no-op (e.g. nothing to send).
    pub ok: bool,
    /// Route or module the operation belongs to.
    pub route: String,
    /// Operation name within the route.
    pub name: String,
    /// Free-form comment.
    pub comment: String,
    /// Additional named events to tally alongside the operation itself.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

impl OperationResult {
    /// A successful result.
    pub fn ok(route: impl Into<String>, name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            ok: true,
            route: route.into(),
            name: name.into(),
            comment: comment.into(),
            events: Vec::new(),
        }
    }

    /// A result for an operation that chose not to act.
    pub fn no_op(
        route: impl Into<String>,
        name: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            ok: false,
            ..Self::ok(route, name, comment)
        }
    }

    /// Adds a named event.
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.events.push(event.into());
        self
    }

    /// Tallies this result, and each of its extra events, into `stats`.
    pub fn log_event(&self, stats: &EventStats) {
        let outcome = if self.ok {
            EventOutcome::Ok
        } else {
            EventOutcome::Failure
        };
        stats.tally(&self.route, &self.name, outcome);
        for event in &self.events {
            stats.tally(&self.route, event, outcome);
        }
    }
}

/// A successful operation call: its result plus any work it scheduled.
pub struct OperationOutput<A> {
    /// Outcome record.
    pub result: OperationResult,
    /// Operations to run in a later block.
    pub future_ops: Vec<FutureOperation<A>>,
}

impl<A> OperationOutput<A> {
    /// Output with no scheduled work.
    pub fn new(result: OperationResult) -> Self {
        Self {
            result,
            future_ops: Vec::new(),
        }
    }

    /// Adds a future operation.
    pub fn with_future_op(mut self, op: FutureOperation<A>) -> Self {
        self.future_ops.push(op);
        self
    }
}

impl<A> fmt::Debug for OperationOutput<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationOutput")
            .field("result", &self.result)
            .field("future_ops", &self.future_ops.len())
            .finish_non_exhaustive()
    }
}

impl<A> From<OperationResult> for OperationOutput<A> {
    fn from(result: OperationResult) -> Self {
        Self::new(result)
    }
}

/// A failed operation call. Always fatal to the run.
#[derive(Debug)]
pub struct OperationError {
    /// Outcome record describing the failing call.
    pub result: OperationResult,
    /// The underlying error.
    pub source: BoxError,
}

impl OperationError {
    /// Creates an operation error.
    pub fn new(result: OperationResult, source: impl Into<BoxError>) -> Self {
        Self {
            result,
            source: source.into(),
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} failed: {}",
            self.result.route, self.result.name, self.source
        )
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

// ============================================================================
// Future Operations
// ============================================================================

/// When a deferred operation becomes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Run in the block with this height.
    AtHeight(u64),
    /// Run in the first block whose timestamp is at or after this time.
    AtTime(DateTime<Utc>),
}

/// An operation scheduled by another operation.
pub struct FutureOperation<A> {
    /// When to run.
    pub schedule: Schedule,
    /// What to run.
    pub op: Operation<A>,
}

impl<A> FutureOperation<A> {
    /// Schedules `op` for block `height`.
    pub fn at_height(height: u64, op: Operation<A>) -> Self {
        Self {
            schedule: Schedule::AtHeight(height),
            op,
        }
    }

    /// Schedules `op` for the first block at or after `time`.
    pub fn at_time(time: DateTime<Utc>, op: Operation<A>) -> Self {
        Self {
            schedule: Schedule::AtTime(time),
            op,
        }
    }
}

impl<A> fmt::Debug for FutureOperation<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureOperation")
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}
