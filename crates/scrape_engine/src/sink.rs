use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use scrape_core::BatchOutcome;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("sink lock poisoned")]
    Poisoned,
}

/// Append-only destination for per-target outcomes, one record at a time.
pub trait RecordSink: Send + Sync {
    fn append(&self, outcome: &BatchOutcome) -> Result<(), SinkError>;
}

/// Appends one JSON document per line to a file.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Opens `path` for appending, creating it and its parent directory if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for JsonLinesSink {
    fn append(&self, outcome: &BatchOutcome) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(outcome)?;
        line.push('\n');
        let mut file = self.file.lock().map_err(|_| SinkError::Poisoned)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Keeps serialized records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Value>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Value> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl RecordSink for MemorySink {
    fn append(&self, outcome: &BatchOutcome) -> Result<(), SinkError> {
        let value = serde_json::to_value(outcome)?;
        self.records
            .lock()
            .map_err(|_| SinkError::Poisoned)?
            .push(value);
        Ok(())
    }
}
