#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for geotweet cleaning and loading.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use geotweet_cli_utils::{IndicatifProgress, init_logger};
use geotweet_ingest::pipeline::{clean_to_writer, initialize, run_pending};
use geotweet_ingest::report_log::ReportLog;
use geotweet_ingest::{IngestConfig, load_config};
use geotweet_ingest_models::DEFAULT_CONFIG_FILE;
use geotweet_load_models::LoadMode;
use geotweet_source::work_queue::{FileWorkQueue, WorkQueue};

#[derive(Parser)]
#[command(name = "geotweet_ingest", about = "Geotweet cleaning and loading tool")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Overrides `data_dir` from the configuration file
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Overrides `logs_dir` from the configuration file
    #[arg(long)]
    logs_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue every `*.json` file in the data directory and clear the report logs
    Init,
    /// Clean and load queued files into the configured backend
    Run {
        /// Stop after this many files
        #[arg(long)]
        limit: Option<usize>,
        /// Overrides `load_mode` ("single" or "bulk")
        #[arg(long)]
        mode: Option<LoadMode>,
    },
    /// Clean one file and write the cleaned records as NDJSON
    Clean {
        /// Input file
        file: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show pending files and load totals
    Status,
}

impl Cli {
    fn config(&self) -> Result<IngestConfig, Box<dyn std::error::Error>> {
        let mut config = load_config(&self.config)
            .map_err(|e| format!("{}: {e}", self.config.display()))?;
        if let Some(data_dir) = &self.data_dir {
            config.data_dir.clone_from(data_dir);
        }
        if let Some(logs_dir) = &self.logs_dir {
            config.logs_dir.clone_from(logs_dir);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Init => {
            let config = cli.config()?;
            let names = initialize(&config.data_dir, &config.logs_dir)?;
            log::info!(
                "Queued {} file(s) from {}",
                names.len(),
                config.data_dir.display()
            );
        }
        Commands::Run { limit, mode } => {
            let config = cli.config()?;
            let mode = mode.unwrap_or(config.load_mode);

            let mut queue = FileWorkQueue::open(&config.logs_dir);
            let reports = ReportLog::new(&config.logs_dir);
            let mut adapter = geotweet_load::connect(&config.backend).await?;

            let start = Instant::now();
            let files_progress = IndicatifProgress::files_bar(&multi);
            let result = run_pending(
                &mut queue,
                adapter.as_mut(),
                &reports,
                &config.data_dir,
                mode,
                *limit,
                &files_progress,
                &|file_name| IndicatifProgress::records_bar(&multi, file_name),
            )
            .await;

            if let Err(e) = adapter.close().await {
                log::error!("Failed to close {} backend: {e}", adapter.backend());
            }

            let summary = result?;
            log::info!(
                "Run complete: {} file(s), {} records loaded, {} dropped in {:.1}s",
                summary.files.len(),
                summary.records_loaded(),
                summary.records_dropped(),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Clean { file, output } => {
            let report = if let Some(path) = output {
                let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
                clean_to_writer(file, &mut out)?
            } else {
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                clean_to_writer(file, &mut out)?
            };
            eprintln!("{}", serde_json::to_string(&report)?);
        }
        Commands::Status => {
            let config = cli.config()?;
            let pending = FileWorkQueue::open(&config.logs_dir).pending()?;
            let loads = ReportLog::new(&config.logs_dir).load_reports()?;

            println!("{:<16} {}", "BACKEND", config.backend.kind());
            println!("{:<16} {}", "PENDING FILES", pending.len());
            if let Some(next) = pending.first() {
                println!("{:<16} {next}", "NEXT");
            }
            println!("{:<16} {}", "LOADED FILES", loads.len());
            println!(
                "{:<16} {}",
                "RECORDS LOADED",
                loads.iter().map(|r| r.success_count).sum::<u64>()
            );
            println!(
                "{:<16} {}",
                "RECORDS FAILED",
                loads.iter().map(|r| r.fail_count).sum::<u64>()
            );
        }
    }

    Ok(())
}
