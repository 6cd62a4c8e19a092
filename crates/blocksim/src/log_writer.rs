//! Per-block operation logs.
//!
//! Entries are buffered in memory for the whole run and only written out by
//! [`LogWriter::print_logs`], which the driver calls right before a fatal
//! abort or while a panic unwinds.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::operation::OperationResult;

// ============================================================================
// Entries
// ============================================================================

/// Kind of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    BeginBlock,
    EndBlock,
    Operation,
    QueuedOperation,
}

/// One structured log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEntry {
    pub kind: EntryKind,
    pub height: u64,
    /// Slot index within the block. Absent for block markers and queued operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OperationResult>,
}

impl OperationEntry {
    pub fn begin_block(height: u64) -> Self {
        Self {
            kind: EntryKind::BeginBlock,
            height,
            index: None,
            result: None,
        }
    }

    pub fn end_block(height: u64) -> Self {
        Self {
            kind: EntryKind::EndBlock,
            height,
            index: None,
            result: None,
        }
    }

    /// Entry for a primary operation in slot `index`.
    pub fn operation(height: u64, index: usize, result: OperationResult) -> Self {
        Self {
            kind: EntryKind::Operation,
            height,
            index: Some(index),
            result: Some(result),
        }
    }

    /// Entry for an operation drained from a deferred queue.
    pub fn queued(height: u64, result: OperationResult) -> Self {
        Self {
            kind: EntryKind::QueuedOperation,
            height,
            index: None,
            result: Some(result),
        }
    }
}

// ============================================================================
// Writers
// ============================================================================

/// Append-only operation log.
pub trait LogWriter: Send {
    /// Appends an entry.
    fn add_entry(&mut self, entry: OperationEntry);

    /// Writes every entry accumulated so far to the writer's sink.
    fn print_logs(&mut self) -> io::Result<()>;
}

/// Destination of a [`StandardLogWriter`] dump.
pub enum LogSink {
    /// A directory receiving one timestamped `simulation-logs-*.jsonl` file per dump.
    Directory(PathBuf),
    /// Standard error.
    Stderr,
    /// Any writer.
    Writer(Box<dyn Write + Send>),
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSink::Directory(dir) => f.debug_tuple("Directory").field(dir).finish(),
            LogSink::Stderr => f.write_str("Stderr"),
            LogSink::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

/// Buffers entries and dumps them as JSON lines.
#[derive(Debug)]
pub struct StandardLogWriter {
    entries: Vec<OperationEntry>,
    sink: LogSink,
    last_dump: Option<PathBuf>,
}

impl StandardLogWriter {
    /// Creates a writer dumping to `sink`.
    pub fn new(sink: LogSink) -> Self {
        Self {
            entries: Vec::new(),
            sink,
            last_dump: None,
        }
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffered entries.
    pub fn entries(&self) -> &[OperationEntry] {
        &self.entries
    }

    /// File written by the most recent directory dump.
    pub fn last_dump(&self) -> Option<&Path> {
        self.last_dump.as_deref()
    }

    fn write_entries(entries: &[OperationEntry], w: &mut dyn Write) -> io::Result<()> {
        for entry in entries {
            serde_json::to_writer(&mut *w, entry).map_err(io::Error::other)?;
            w.write_all(b"\n")?;
        }
        w.flush()
    }
}

impl LogWriter for StandardLogWriter {
    fn add_entry(&mut self, entry: OperationEntry) {
        self.entries.push(entry);
    }

    fn print_logs(&mut self) -> io::Result<()> {
        match &mut self.sink {
            LogSink::Directory(dir) => {
                fs::create_dir_all(&*dir)?;
                let name = format!(
                    "simulation-logs-{}.jsonl",
                    chrono::Utc::now().format("%Y%m%d-%H%M%S%.3f")
                );
                let path = dir.join(name);
                let mut file = BufWriter::new(File::create(&path)?);
                Self::write_entries(&self.entries, &mut file)?;
                tracing::warn!(path = %path.display(), "wrote simulation logs");
                self.last_dump = Some(path);
            }
            LogSink::Stderr => {
                let stderr = io::stderr();
                let mut lock = stderr.lock();
                Self::write_entries(&self.entries, &mut lock)?;
            }
            LogSink::Writer(w) => Self::write_entries(&self.entries, w.as_mut())?,
        }
        tracing::info!(entries = self.entries.len(), "dumped simulation logs");
        Ok(())
    }
}

/// Discards every entry. Used in benchmark mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyLogWriter;

impl LogWriter for DummyLogWriter {
    fn add_entry(&mut self, _entry: OperationEntry) {}

    fn print_logs(&mut self) -> io::Result<()> {
        Ok(())
    }
}
