//! Append-only JSON-lines logs of cleaning and load reports.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use geotweet_load_models::LoadReport;
use geotweet_record_models::CleaningReport;
use serde::Serialize;

use crate::IngestError;

/// One [`CleaningReport`] per line.
pub const CLEANING_LOG: &str = "cleaning_log.txt";

/// One [`LoadReport`] per line.
pub const LOAD_LOG: &str = "loaded_files.txt";

/// The report logs kept in a logs directory.
#[derive(Debug, Clone)]
pub struct ReportLog {
    dir: PathBuf,
}

impl ReportLog {
    #[must_use]
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            dir: logs_dir.to_path_buf(),
        }
    }

    #[must_use]
    pub fn cleaning_path(&self) -> PathBuf {
        self.dir.join(CLEANING_LOG)
    }

    #[must_use]
    pub fn load_path(&self) -> PathBuf {
        self.dir.join(LOAD_LOG)
    }

    /// Empties both logs, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Io`] if the files cannot be written.
    pub fn reset(&self) -> Result<(), IngestError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.cleaning_path(), "")?;
        std::fs::write(self.load_path(), "")?;
        Ok(())
    }

    /// Appends a cleaning report line.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the report cannot be serialized or
    /// written.
    pub fn append_cleaning(&self, report: &CleaningReport) -> Result<(), IngestError> {
        append_line(&self.cleaning_path(), report)
    }

    /// Appends a load report line.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the report cannot be serialized or
    /// written.
    pub fn append_load(&self, report: &LoadReport) -> Result<(), IngestError> {
        append_line(&self.load_path(), report)
    }

    /// Reads back every load report. A missing log is empty.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the log cannot be read or a line does not
    /// parse.
    pub fn load_reports(&self) -> Result<Vec<LoadReport>, IngestError> {
        let contents = match std::fs::read_to_string(self.load_path()) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(IngestError::from))
            .collect()
    }
}

fn append_line<T: Serialize>(path: &Path, value: &T) -> Result<(), IngestError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let line = serde_json::to_string(value)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}
