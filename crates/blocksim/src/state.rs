//! Mutable state of a simulation run.

use std::fmt;

use chrono::Duration;

use crate::block_size::BlockSizeGenerator;
use crate::chain::{BlockHeader, ValidatorSet};
use crate::log_writer::LogWriter;
use crate::operation::{FutureOperation, Schedule};
use crate::params::SimParams;
use crate::queue::{HeightQueue, TimeQueue};
use crate::rng::SimRng;
use crate::stats::EventStats;

/// Everything the block loop mutates. Owned by the driver for one run.
pub struct SimState<A> {
    /// Header of the block being simulated.
    pub header: BlockHeader,

    /// Operations run so far, primary and deferred.
    pub op_count: u64,

    /// Deferred operations keyed by height.
    pub height_queue: HeightQueue<A>,

    /// Deferred operations keyed by trigger time.
    pub time_queue: TimeQueue<A>,

    /// Outcome tally.
    pub event_stats: EventStats,

    /// Operation log.
    pub log_writer: Box<dyn LogWriter>,

    /// Only log successful operations.
    pub lean: bool,

    /// Proposer candidates.
    pub validators: ValidatorSet,

    /// Parameters drawn at run start.
    pub params: SimParams,

    /// Block-size state machine.
    pub block_sizes: BlockSizeGenerator,
}

impl<A> SimState<A> {
    /// Creates the state for a run starting at `header`.
    pub fn new(
        header: BlockHeader,
        params: SimParams,
        validators: ValidatorSet,
        log_writer: Box<dyn LogWriter>,
        lean: bool,
    ) -> Self {
        let block_sizes = BlockSizeGenerator::new(params.block_size_transitions.clone());
        Self {
            header,
            op_count: 0,
            height_queue: HeightQueue::new(),
            time_queue: TimeQueue::new(),
            event_stats: EventStats::new(),
            log_writer,
            lean,
            validators,
            params,
            block_sizes,
        }
    }

    /// Routes a future operation to the matching queue.
    ///
    /// Height-scheduled work for a block that already ran can never fire and
    /// is dropped.
    pub fn schedule(&mut self, future: FutureOperation<A>) {
        match future.schedule {
            Schedule::AtHeight(height) if height < self.header.height => {
                tracing::warn!(
                    height,
                    current = self.header.height,
                    "dropping operation scheduled for a past height"
                );
            }
            Schedule::AtHeight(height) => self.height_queue.enqueue(height, future.op),
            Schedule::AtTime(time) => self.time_queue.enqueue(time, future.op),
        }
    }

    /// Moves the header to the next block.
    ///
    /// Height grows by one, time by a random delta within the parameter
    /// bounds, and the proposer is drawn from the validator set.
    pub fn advance_header(&mut self, rng: &mut SimRng) {
        let delta = self.params.block_time_delta(rng);
        self.header.height += 1;
        self.header.time += Duration::seconds(delta as i64);
        if let Some(proposer) = self.validators.random_proposer(rng) {
            self.header.proposer.clone_from(&proposer.address);
        }
    }

    /// Writes every buffered log entry, reporting but not propagating failures.
    pub fn dump_logs(&mut self) {
        if let Err(e) = self.log_writer.print_logs() {
            tracing::error!(error = %e, "failed to write simulation logs");
        }
    }
}

impl<A> fmt::Debug for SimState<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimState")
            .field("header", &self.header)
            .field("op_count", &self.op_count)
            .field("height_queue", &self.height_queue)
            .field("time_queue", &self.time_queue)
            .field("lean", &self.lean)
            .finish_non_exhaustive()
    }
}
