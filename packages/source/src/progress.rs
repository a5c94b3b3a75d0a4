//! Progress reporting for queued files and the records inside them.
//!
//! Library code reports through [`LoadProgress`] and never touches a
//! terminal. Binaries plug in an `indicatif` bar; tests use [`NullProgress`]
//! or [`CountingProgress`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives progress updates while files are processed or records loaded.
pub trait LoadProgress: Send + Sync {
    /// Number of units (files or records) this step will process.
    fn begin(&self, total: u64);

    /// Records that `processed` more units are done, `failed` of which did
    /// not make it into the backend.
    fn advance(&self, processed: u64, failed: u64);

    /// Names the unit being worked on, usually a file name.
    fn current(&self, name: &str);

    /// Marks the step as done with a one-line summary.
    fn finish(&self, summary: &str);
}

/// Discards every update.
pub struct NullProgress;

impl LoadProgress for NullProgress {
    fn begin(&self, _total: u64) {}
    fn advance(&self, _processed: u64, _failed: u64) {}
    fn current(&self, _name: &str) {}
    fn finish(&self, _summary: &str) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn LoadProgress> {
    Arc::new(NullProgress)
}

/// Keeps running totals of every update. Used to check what a step
/// reported.
#[derive(Debug, Default)]
pub struct CountingProgress {
    total: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    finished: AtomicU64,
}

impl CountingProgress {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Whether [`LoadProgress::finish`] was called.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed) > 0
    }
}

impl LoadProgress for CountingProgress {
    fn begin(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }

    fn advance(&self, processed: u64, failed: u64) {
        self.processed.fetch_add(processed, Ordering::Relaxed);
        self.failed.fetch_add(failed, Ordering::Relaxed);
    }

    fn current(&self, _name: &str) {}

    fn finish(&self, _summary: &str) {
        self.finished.fetch_add(1, Ordering::Relaxed);
    }
}
