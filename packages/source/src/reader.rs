//! Newline-delimited JSON input files.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use geotweet_record_models::RawRecord;

use crate::SourceError;

/// Extension of the files picked up by [`discover_files`].
pub const INPUT_EXTENSION: &str = "json";

/// Reads every record of a newline-delimited JSON file.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the file cannot be read, or
/// [`SourceError::Parse`] for the first line that is not a JSON object.
pub fn read_records(path: &Path) -> Result<Vec<RawRecord>, SourceError> {
    log::info!("Reading {}", path.display());

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record = serde_json::from_str(&line).map_err(|source| SourceError::Parse {
            path: path.display().to_string(),
            line: i + 1,
            source,
        })?;
        records.push(record);
    }

    log::info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Lists the names of the `*.json` files directly inside `data_dir`,
/// sorted.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the directory cannot be listed.
pub fn discover_files(data_dir: &Path) -> Result<Vec<String>, SourceError> {
    let mut names = Vec::new();

    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        let is_input = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == INPUT_EXTENSION);

        if let (true, Some(name)) = (is_input, path.file_name().and_then(|n| n.to_str())) {
            names.push(name.to_string());
        }
    }

    names.sort();
    Ok(names)
}
