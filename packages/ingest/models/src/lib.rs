#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion configuration and run summary types.

use std::path::PathBuf;

use geotweet_load_models::{BackendConfig, LoadMode};
use serde::{Deserialize, Serialize};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "geotweet.toml";

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Contents of `geotweet.toml`.
///
/// ```toml
/// data_dir = "data/raw"
/// logs_dir = "logs"
/// load_mode = "bulk"
///
/// [backend]
/// type = "search_index"
/// path = "data/index"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory holding the `*.json` input files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding the work queue and report logs.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    #[serde(default)]
    pub load_mode: LoadMode,
    pub backend: BackendConfig,
}

impl IngestConfig {
    /// Parses a TOML configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`toml::de::Error`] if the document is malformed or the
    /// backend table is missing or unknown.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// Outcome of one processed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub file_name: String,
    pub records_read: u64,
    pub records_rejected: u64,
    pub records_loaded: u64,
    pub records_failed: u64,
}

/// Outcome of a `run` over the work queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub files: Vec<FileSummary>,
}

impl RunSummary {
    /// Total records written across all files.
    #[must_use]
    pub fn records_loaded(&self) -> u64 {
        self.files.iter().map(|f| f.records_loaded).sum()
    }

    /// Total records rejected by cleaning or refused by the backend.
    #[must_use]
    pub fn records_dropped(&self) -> u64 {
        self.files
            .iter()
            .map(|f| f.records_rejected + f.records_failed)
            .sum()
    }
}
