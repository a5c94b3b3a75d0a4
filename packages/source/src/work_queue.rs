//! Ordered queue of input files still waiting to be processed.
//!
//! The pipeline takes the head of the queue, processes it, and marks it
//! complete. [`FileWorkQueue`] persists the queue as one file name per line
//! so an interrupted run resumes where it stopped; [`MemoryWorkQueue`]
//! keeps it in memory for tests and one-off runs.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::SourceError;

/// A queue of pending input file names.
pub trait WorkQueue {
    /// Returns every pending file name, in processing order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the queue state cannot be read.
    fn pending(&self) -> Result<Vec<String>, SourceError>;

    /// Returns the next file to process without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the queue state cannot be read.
    fn next(&self) -> Result<Option<String>, SourceError> {
        Ok(self.pending()?.into_iter().next())
    }

    /// Removes a processed file from the queue.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Queue`] if the file is not pending, or
    /// [`SourceError::Io`] if the new state cannot be written.
    fn complete(&mut self, file_name: &str) -> Result<(), SourceError>;
}

/// A work queue persisted as `files_to_load.txt` in the logs directory.
#[derive(Debug, Clone)]
pub struct FileWorkQueue {
    path: PathBuf,
}

impl FileWorkQueue {
    /// Name of the queue file inside the logs directory.
    pub const FILE_NAME: &'static str = "files_to_load.txt";

    /// Opens the queue stored in `logs_dir`. A missing queue file is an
    /// empty queue.
    #[must_use]
    pub fn open(logs_dir: &Path) -> Self {
        Self {
            path: logs_dir.join(Self::FILE_NAME),
        }
    }

    /// Creates (or overwrites) the queue in `logs_dir` with `file_names`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the directory or file cannot be
    /// written.
    pub fn initialize(logs_dir: &Path, file_names: &[String]) -> Result<Self, SourceError> {
        std::fs::create_dir_all(logs_dir)?;
        let queue = Self::open(logs_dir);
        queue.write(file_names)?;
        log::info!(
            "Initialized work queue with {} file(s) at {}",
            file_names.len(),
            queue.path.display()
        );
        Ok(queue)
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, file_names: &[String]) -> Result<(), SourceError> {
        let mut contents = String::new();
        for name in file_names {
            contents.push_str(name);
            contents.push('\n');
        }

        let tmp = self.path.with_extension("txt.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl WorkQueue for FileWorkQueue {
    fn pending(&self) -> Result<Vec<String>, SourceError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn complete(&mut self, file_name: &str) -> Result<(), SourceError> {
        let mut pending = self.pending()?;
        let Some(pos) = pending.iter().position(|name| name == file_name) else {
            return Err(SourceError::Queue {
                message: format!("{file_name} is not pending"),
            });
        };

        pending.remove(pos);
        self.write(&pending)?;
        log::debug!("Marked {file_name} complete, {} remaining", pending.len());
        Ok(())
    }
}

/// An in-memory work queue.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkQueue {
    pending: VecDeque<String>,
}

impl MemoryWorkQueue {
    #[must_use]
    pub fn new(file_names: impl IntoIterator<Item = String>) -> Self {
        Self {
            pending: file_names.into_iter().collect(),
        }
    }
}

impl WorkQueue for MemoryWorkQueue {
    fn pending(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.pending.iter().cloned().collect())
    }

    fn next(&self) -> Result<Option<String>, SourceError> {
        Ok(self.pending.front().cloned())
    }

    fn complete(&mut self, file_name: &str) -> Result<(), SourceError> {
        let Some(pos) = self.pending.iter().position(|name| name == file_name) else {
            return Err(SourceError::Queue {
                message: format!("{file_name} is not pending"),
            });
        };
        self.pending.remove(pos);
        Ok(())
    }
}
