//! Append-only sink for failures that were caught and skipped.
//!
//! Every entry names the file being processed and what went wrong. [`FileLogSink`] writes
//! them as line pairs:
//!
//! ```text
//! ERROR: /data/out/p1/ct/1.dcm
//! EXCEPTION: (0018,A001)[0].(0008,0070) Manufacturer: sequence (0018,A001) not found
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub path: String,
    pub detail: String,
}

pub trait LogSink: Send + Sync {
    fn record(&self, entry: LogEntry);
}

#[derive(Debug, Default)]
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    fn record(&self, _entry: LogEntry) {}
}

/// Writes entries to a text file, flushing after each one.
#[derive(Debug)]
pub struct FileLogSink {
    writer: Mutex<BufWriter<File>>,
}

impl FileLogSink {
    /// Creates (or truncates) the log file at `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl LogSink for FileLogSink {
    fn record(&self, entry: LogEntry) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let result = writeln!(writer, "ERROR: {}", entry.path)
            .and_then(|_| writeln!(writer, "EXCEPTION: {}", entry.detail))
            .and_then(|_| writer.flush());
        if let Err(e) = result {
            log::error!("unable to write to log file: {e}");
        }
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemoryLogSink {
    fn record(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
