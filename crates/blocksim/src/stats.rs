//! Event statistics.
//!
//! A tally of operation outcomes keyed by route, operation name and outcome.
//! Handles are cheap to clone and share one table.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Outcome of an operation as recorded in the statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    Ok,
    Failure,
}

impl fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventOutcome::Ok => write!(f, "ok"),
            EventOutcome::Failure => write!(f, "failure"),
        }
    }
}

/// route -> name -> outcome -> count
pub type EventTable = BTreeMap<String, BTreeMap<String, BTreeMap<EventOutcome, u64>>>;

/// Thread-safe event tally.
#[derive(Debug, Clone, Default)]
pub struct EventStats {
    table: Arc<Mutex<EventTable>>,
}

impl EventStats {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, EventTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one occurrence.
    pub fn tally(&self, route: &str, name: &str, outcome: EventOutcome) {
        let mut table = self.lock();
        *table
            .entry(route.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default()
            .entry(outcome)
            .or_insert(0) += 1;
    }

    /// Number of recorded occurrences for a key.
    pub fn count(&self, route: &str, name: &str, outcome: EventOutcome) -> u64 {
        self.lock()
            .get(route)
            .and_then(|names| names.get(name))
            .and_then(|outcomes| outcomes.get(&outcome))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all recorded occurrences.
    pub fn total(&self) -> u64 {
        self.lock()
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .sum()
    }

    /// Copy of the current table.
    pub fn snapshot(&self) -> EventTable {
        self.lock().clone()
    }

    /// Exports the statistics.
    ///
    /// Writes the table as pretty JSON to `path` unless it is `None` or empty,
    /// then writes a per-route summary to `w`.
    pub fn export_events(&self, path: Option<&Path>, w: &mut dyn Write) -> Result<(), SimError> {
        let table = self.snapshot();

        if let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_vec_pretty(&table)?;
            fs::write(path, json)?;
            tracing::info!(path = %path.display(), "exported simulation statistics");
        }

        writeln!(w, "Operation statistics:")?;
        for (route, names) in &table {
            for (name, outcomes) in names {
                let ok = outcomes.get(&EventOutcome::Ok).copied().unwrap_or(0);
                let failure = outcomes.get(&EventOutcome::Failure).copied().unwrap_or(0);
                writeln!(w, "  {route}/{name}: ok={ok} failure={failure}")?;
            }
        }
        Ok(())
    }
}
