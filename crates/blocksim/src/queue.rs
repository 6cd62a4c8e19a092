//! Deferred operation queues.
//!
//! Operations may schedule follow-up work either for a specific block height
//! or for the first block whose timestamp reaches a given time. Both queues
//! are one-shot: an entry is handed out exactly once.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::operation::Operation;

// ============================================================================
// Height Queue
// ============================================================================

/// Operations keyed by the block height they run at.
pub struct HeightQueue<A> {
    entries: BTreeMap<u64, Vec<Operation<A>>>,
}

impl<A> HeightQueue<A> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Schedules `op` for block `height`. Operations for the same height
    /// keep insertion order.
    pub fn enqueue(&mut self, height: u64, op: Operation<A>) {
        self.entries.entry(height).or_default().push(op);
    }

    /// Removes and returns everything scheduled for `height`.
    pub fn drain(&mut self, height: u64) -> Vec<Operation<A>> {
        self.entries.remove(&height).unwrap_or_default()
    }

    /// Total number of pending operations.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A> Default for HeightQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for HeightQueue<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heights: Vec<_> = self.entries.iter().map(|(h, ops)| (*h, ops.len())).collect();
        f.debug_struct("HeightQueue").field("heights", &heights).finish()
    }
}

// ============================================================================
// Time Queue
// ============================================================================

/// Operations ordered by trigger time.
///
/// Kept sorted ascending at all times. Entries with equal trigger times stay
/// in insertion order.
pub struct TimeQueue<A> {
    entries: Vec<(DateTime<Utc>, Operation<A>)>,
}

impl<A> TimeQueue<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts `op`, after any entries with the same trigger time.
    pub fn enqueue(&mut self, time: DateTime<Utc>, op: Operation<A>) {
        let pos = self.entries.partition_point(|(t, _)| *t <= time);
        self.entries.insert(pos, (time, op));
    }

    /// Removes and returns, in ascending order, every entry due at or
    /// before `now`.
    pub fn drain_due(&mut self, now: DateTime<Utc>) -> Vec<Operation<A>> {
        let due = self.entries.partition_point(|(t, _)| *t <= now);
        self.entries.drain(..due).map(|(_, op)| op).collect()
    }

    /// Trigger time of the earliest pending entry.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.entries.first().map(|(t, _)| *t)
    }

    /// Pending trigger times, ascending.
    pub fn times(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.entries.iter().map(|(t, _)| *t)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A> Default for TimeQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for TimeQueue<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeQueue")
            .field("len", &self.entries.len())
            .field("next_due", &self.next_due())
            .finish()
    }
}
