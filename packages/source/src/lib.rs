#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Input side of the geotweet pipeline.
//!
//! [`reader`] turns newline-delimited JSON files into raw records,
//! [`work_queue`] tracks which files remain to be processed, and
//! [`progress`] decouples progress reporting from any renderer.

pub mod progress;
pub mod reader;
pub mod work_queue;

/// Errors that can occur while reading input or tracking progress.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line of an input file is not a JSON object.
    #[error("Parse error in {path} line {line}: {source}")]
    Parse {
        /// File being read.
        path: String,
        /// One-based line number.
        line: usize,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The work queue was asked to do something inconsistent.
    #[error("Work queue error: {message}")]
    Queue {
        /// Description of what went wrong.
        message: String,
    },
}
