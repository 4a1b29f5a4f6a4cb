use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use scrape_core::{BatchReport, BatchSummary};
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Ensure the output directory exists and accepts new files.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Writes `{dir}/{filename}` through a temp file and a rename, so readers never see a partial file.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportDocument<'a> {
    summary: &'a BatchSummary,
    failed_urls: Vec<&'a str>,
}

/// Persists the batch summary and the failed source URLs as `report.json`.
pub fn write_report(dir: &Path, report: &BatchReport) -> Result<PathBuf, PersistError> {
    let document = ReportDocument {
        summary: &report.summary,
        failed_urls: report.failed_urls(),
    };
    let content = serde_json::to_string_pretty(&document)?;
    AtomicFileWriter::new(dir.to_path_buf()).write(REPORT_FILE, &content)
}
