//! Single-block execution.
//!
//! A block moves through these phases:
//!
//! ```text
//! SizeDetermined -> OperationsSelected -> OperationsExecuted -> DeferredDrained -> Done
//! ```
//!
//! All slots are selected, each with its own derived random source, before
//! any of them executes. An operation's appetite for randomness therefore
//! never changes which operations run later in the block.

use std::io::Write;

use crate::chain::Account;
use crate::error::SimError;
use crate::log_writer::OperationEntry;
use crate::operation::{Operation, OperationError, OperationResult};
use crate::rng::SimRng;
use crate::selector::OperationSelector;
use crate::state::SimState;

/// Operations between two progress lines.
pub const PROGRESS_INTERVAL: usize = 50;

/// What one block did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockReport {
    /// Number of primary operations drawn for the block.
    pub block_size: usize,
    /// Number of deferred operations drained and run.
    pub queued_ran: usize,
}

impl BlockReport {
    /// Every operation the block ran.
    pub fn total(&self) -> usize {
        self.block_size + self.queued_ran
    }
}

/// Runs blocks against a fixed catalog.
pub struct BlockSimulator<'a, A> {
    selector: &'a OperationSelector<A>,
    max_block_size: usize,
    num_blocks: u64,
    show_progress: bool,
}

impl<'a, A> BlockSimulator<'a, A> {
    pub fn new(selector: &'a OperationSelector<A>, max_block_size: usize, num_blocks: u64) -> Self {
        Self {
            selector,
            max_block_size,
            num_blocks,
            show_progress: true,
        }
    }

    /// Enables or disables the periodic progress line.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Runs one block at `state.header`.
    ///
    /// Returns the first operation error after dumping the operation log.
    /// Header advance and commit are left to the caller.
    pub fn simulate_block(
        &self,
        rng: &mut SimRng,
        app: &mut A,
        state: &mut SimState<A>,
        accounts: &[Account],
        w: &mut dyn Write,
    ) -> Result<BlockReport, SimError> {
        let height = state.header.height;

        let block_size = state.block_sizes.next(rng, self.max_block_size);

        let slots: Vec<_> = (0..block_size)
            .map(|_| {
                let op = self.selector.select(rng);
                (op, rng.derive())
            })
            .collect();

        for (index, (selected, mut op_rng)) in slots.into_iter().enumerate() {
            let outcome = (selected.op)(
                &mut op_rng,
                app,
                &state.header,
                accounts,
                &state.header.chain_id,
            );

            match outcome {
                Ok(output) => {
                    output.result.log_event(&state.event_stats);
                    if !state.lean || output.result.ok {
                        state
                            .log_writer
                            .add_entry(OperationEntry::operation(height, index, output.result));
                    }
                    for future in output.future_ops {
                        state.schedule(future);
                    }
                }
                Err(err) => {
                    let OperationError { result, source } = err;
                    result.log_event(&state.event_stats);
                    state
                        .log_writer
                        .add_entry(OperationEntry::operation(height, index, result.clone()));
                    state.dump_logs();
                    tracing::error!(
                        height,
                        index,
                        route = %result.route,
                        name = %result.name,
                        operation = %selected.name,
                        error = %source,
                        "operation failed"
                    );
                    return Err(SimError::Operation {
                        height,
                        index,
                        route: result.route,
                        name: result.name,
                        comment: result.comment,
                        source,
                    });
                }
            }

            let done = index + 1;
            if self.show_progress && done % PROGRESS_INTERVAL == 0 {
                write!(
                    w,
                    "\rSimulating... block {height}/{}, operation {done}/{block_size}. ",
                    self.num_blocks
                )?;
            }
        }

        let mut queued_ran = 0;
        let due_by_height = state.height_queue.drain(height);
        queued_ran += run_queued(rng, app, state, accounts, due_by_height)?;
        let due_by_time = state.time_queue.drain_due(state.header.time);
        queued_ran += run_queued(rng, app, state, accounts, due_by_time)?;

        tracing::debug!(height, block_size, queued_ran, "simulated block");

        Ok(BlockReport {
            block_size,
            queued_ran,
        })
    }
}

/// Runs drained deferred operations in order, each with a fresh derived
/// random source. Work they schedule in turn is discarded.
fn run_queued<A>(
    rng: &mut SimRng,
    app: &mut A,
    state: &mut SimState<A>,
    accounts: &[Account],
    ops: Vec<Operation<A>>,
) -> Result<usize, SimError> {
    let height = state.header.height;
    let count = ops.len();

    for op in ops {
        let mut op_rng = rng.derive();
        match op(
            &mut op_rng,
            app,
            &state.header,
            accounts,
            &state.header.chain_id,
        ) {
            Ok(output) => {
                record_queued(state, height, output.result);
                if !output.future_ops.is_empty() {
                    tracing::debug!(
                        height,
                        discarded = output.future_ops.len(),
                        "deferred operation tried to schedule more work"
                    );
                }
            }
            Err(err) => {
                let OperationError { result, source } = err;
                result.log_event(&state.event_stats);
                state
                    .log_writer
                    .add_entry(OperationEntry::queued(height, result.clone()));
                state.dump_logs();
                tracing::error!(
                    height,
                    route = %result.route,
                    name = %result.name,
                    error = %source,
                    "deferred operation failed"
                );
                return Err(SimError::QueuedOperation {
                    height,
                    route: result.route,
                    name: result.name,
                    comment: result.comment,
                    source,
                });
            }
        }
    }

    Ok(count)
}

fn record_queued<A>(state: &mut SimState<A>, height: u64, result: OperationResult) {
    result.log_event(&state.event_stats);
    if !state.lean || result.ok {
        state
            .log_writer
            .add_entry(OperationEntry::queued(height, result));
    }
}
