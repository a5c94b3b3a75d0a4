#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the geotweet binaries.
//!
//! [`IndicatifProgress`] renders [`LoadProgress`] updates as `indicatif`
//! bars, and [`init_logger`] routes `log` output through
//! `indicatif-log-bridge` so log lines do not tear the bars.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use geotweet_source::progress::LoadProgress;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const RECORDS_WAITING: &str = "{spinner:.cyan} {prefix:.bold} cleaning...";
const RECORDS_LOADING: &str =
    "{prefix:.bold} {wide_bar:.cyan/dim} {pos}/{len} records {msg} [{eta}]";
const FILES: &str = "files {wide_bar:.green/dim} {pos}/{len} {msg} [{elapsed_precise}]";

/// Crates whose own logging is only shown at `warn` and above unless
/// `RUST_LOG` names them.
const NOISY_CRATES: &[&str] = &["tantivy", "neo4rs", "duckdb"];

/// An `indicatif` [`ProgressBar`] that implements [`LoadProgress`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Applied by `begin()`. A records bar spins until its file is cleaned.
    loading_style: Option<ProgressStyle>,
    /// Failures seen so far, shown next to the bar once non-zero.
    failed: AtomicU64,
}

impl IndicatifProgress {
    /// Bar for loading the records of `file_name`.
    #[must_use]
    pub fn records_bar(multi: &MultiProgress, file_name: &str) -> Arc<dyn LoadProgress> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.set_style(style(RECORDS_WAITING, ProgressStyle::default_spinner()));
        bar.set_prefix(file_name.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));

        Arc::new(Self {
            bar,
            loading_style: Some(
                style(RECORDS_LOADING, ProgressStyle::default_bar()).progress_chars("=> "),
            ),
            failed: AtomicU64::new(0),
        })
    }

    /// Bar counting queued files through a run. The message shows the file
    /// being processed.
    #[must_use]
    pub fn files_bar(multi: &MultiProgress) -> Arc<dyn LoadProgress> {
        let bar = multi.add(ProgressBar::new(0));
        bar.set_style(style(FILES, ProgressStyle::default_bar()).progress_chars("=> "));

        Arc::new(Self {
            bar,
            loading_style: None,
            failed: AtomicU64::new(0),
        })
    }
}

fn style(template: &str, fallback: ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or(fallback)
}

impl LoadProgress for IndicatifProgress {
    fn begin(&self, total: u64) {
        if let Some(loading) = &self.loading_style {
            self.bar.disable_steady_tick();
            self.bar.set_style(loading.clone());
        }
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.failed.store(0, Ordering::Relaxed);
    }

    fn advance(&self, processed: u64, failed: u64) {
        if failed > 0 {
            let failed = self.failed.fetch_add(failed, Ordering::Relaxed) + failed;
            self.bar.set_message(format!("({failed} failed)"));
        }
        self.bar.inc(processed);
    }

    fn current(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn finish(&self, summary: &str) {
        self.bar.finish_with_message(summary.to_string());
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// Defaults to `info`, with [`NOISY_CRATES`] held at `warn`; `RUST_LOG`
/// overrides both. Returns the [`MultiProgress`] that every progress bar
/// must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    for name in NOISY_CRATES {
        builder.filter_module(name, log::LevelFilter::Warn);
    }
    builder.parse_env("RUST_LOG");
    let logger = builder.build();
    let level = logger.filter();

    // Fails only if a logger is already installed.
    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
