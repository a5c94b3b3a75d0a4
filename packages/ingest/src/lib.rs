#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library behind the `geotweet_ingest` CLI.
//!
//! Files are processed one at a time from the work queue in the logs
//! directory: each is read, cleaned, logged to `cleaning_log.txt`, loaded
//! into the configured backend, logged to `loaded_files.txt`, and only then
//! removed from the queue, so an interrupted run resumes at the file it
//! stopped on.

pub mod pipeline;
pub mod report_log;

use std::path::Path;

pub use geotweet_ingest_models::{FileSummary, IngestConfig, RunSummary};

/// Errors that stop an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Input or work queue error.
    #[error("Source error: {0}")]
    Source(#[from] geotweet_source::SourceError),

    /// Backend error.
    #[error("Load error: {0}")]
    Load(#[from] geotweet_load::LoadError),

    /// Configuration file error.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads and parses the configuration file at `path`.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<IngestConfig, IngestError> {
    log::debug!("Reading configuration from {}", path.display());
    let contents = std::fs::read_to_string(path)?;
    Ok(IngestConfig::from_toml(&contents)?)
}
