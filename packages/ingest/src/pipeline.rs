//! File-at-a-time ingestion: read, clean, report, load, mark complete.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use geotweet_clean::CleanedBatch;
use geotweet_ingest_models::{FileSummary, RunSummary};
use geotweet_load::PersistenceAdapter;
use geotweet_load::loader::load_batch;
use geotweet_load_models::LoadMode;
use geotweet_record_models::CleaningReport;
use geotweet_source::progress::LoadProgress;
use geotweet_source::reader::{discover_files, read_records};
use geotweet_source::work_queue::{FileWorkQueue, WorkQueue};

use crate::IngestError;
use crate::report_log::ReportLog;

/// Builds the progress indicator for the records of one file.
pub type RecordsProgress<'a> = &'a dyn Fn(&str) -> Arc<dyn LoadProgress>;

/// Queues every `*.json` file in `data_dir` and clears the report logs.
///
/// Returns the queued file names in processing order.
///
/// # Errors
///
/// Returns [`IngestError`] if the data directory cannot be listed or the
/// logs directory cannot be written.
pub fn initialize(data_dir: &Path, logs_dir: &Path) -> Result<Vec<String>, IngestError> {
    let names = discover_files(data_dir)?;
    if names.is_empty() {
        log::warn!("No input files found in {}", data_dir.display());
    }

    FileWorkQueue::initialize(logs_dir, &names)?;
    ReportLog::new(logs_dir).reset()?;

    Ok(names)
}

/// Reads and cleans one input file.
///
/// # Errors
///
/// Returns [`IngestError::Source`] if the file cannot be read or a line is
/// not a JSON object.
pub fn clean_file(data_dir: &Path, file_name: &str) -> Result<CleanedBatch, IngestError> {
    let raw = read_records(&data_dir.join(file_name))?;
    Ok(geotweet_clean::clean(file_name, raw))
}

/// Cleans one file and writes the cleaned records as newline-delimited
/// JSON to `out`.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or the output cannot
/// be written.
pub fn clean_to_writer(
    path: &Path,
    out: &mut dyn Write,
) -> Result<CleaningReport, IngestError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let batch = geotweet_clean::clean(&file_name, read_records(path)?);

    for record in &batch.records {
        serde_json::to_writer(&mut *out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    Ok(batch.report)
}

/// Processes one queued file end to end and marks it complete.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read, a report cannot be
/// logged, or the queue cannot be updated. Backend failures for individual
/// records are not errors; they are counted in the load report.
pub async fn process_file(
    queue: &mut dyn WorkQueue,
    adapter: &mut dyn PersistenceAdapter,
    reports: &ReportLog,
    data_dir: &Path,
    file_name: &str,
    mode: LoadMode,
    progress: &Arc<dyn LoadProgress>,
) -> Result<FileSummary, IngestError> {
    let CleanedBatch { records, report } = clean_file(data_dir, file_name)?;
    reports.append_cleaning(&report)?;

    let load = load_batch(adapter, file_name, &records, mode, progress).await;
    reports.append_load(&load)?;

    queue.complete(file_name)?;

    let rejected = report.rejected.len() as u64;
    Ok(FileSummary {
        file_name: file_name.to_string(),
        records_read: records.len() as u64 + rejected,
        records_rejected: rejected,
        records_loaded: load.success_count,
        records_failed: load.fail_count,
    })
}

/// Processes queued files in order until the queue is empty or
/// `max_files` have been processed.
///
/// A file that cannot be read stops the run and stays at the head of the
/// queue.
///
/// # Errors
///
/// Returns the first [`IngestError`] from [`process_file`].
#[allow(clippy::too_many_arguments)]
pub async fn run_pending(
    queue: &mut dyn WorkQueue,
    adapter: &mut dyn PersistenceAdapter,
    reports: &ReportLog,
    data_dir: &Path,
    mode: LoadMode,
    max_files: Option<usize>,
    files_progress: &Arc<dyn LoadProgress>,
    records_progress: RecordsProgress<'_>,
) -> Result<RunSummary, IngestError> {
    let pending = queue.pending()?.len();
    let total = max_files.map_or(pending, |max| max.min(pending));
    files_progress.begin(total as u64);
    log::info!("{pending} file(s) pending, processing {total}");

    let mut summary = RunSummary::default();

    while summary.files.len() < total {
        let Some(file_name) = queue.next()? else {
            break;
        };
        files_progress.current(&file_name);

        let file = match process_file(
            queue,
            adapter,
            reports,
            data_dir,
            &file_name,
            mode,
            &records_progress(&file_name),
        )
        .await
        {
            Ok(file) => file,
            Err(e) => {
                log::error!("Stopping at {file_name}: {e}");
                return Err(e);
            }
        };

        summary.files.push(file);
        files_progress.advance(1, 0);
    }

    files_progress.finish(&format!(
        "{} file(s), {} records loaded, {} dropped",
        summary.files.len(),
        summary.records_loaded(),
        summary.records_dropped()
    ));

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotweet_load::document::{DocumentStore, IN_MEMORY};
    use geotweet_source::progress::null_progress;
    use geotweet_source::work_queue::MemoryWorkQueue;
    use std::path::PathBuf;

    const NULL_PLACE: &str = r#"{"id_str":"1","timestamp_ms":"1000","place":null,"text":"no place"}"#;
    const CITY: &str = r#"{"id_str":"2","timestamp_ms":2000,"text":"city","place":{"id":"c","name":"Town","full_name":"Town, ST","country":"Somewhere","country_code":"SW","place_type":"city","bounding_box":{"type":"Polygon","coordinates":[[[0,0],[0,1],[1,1],[1,0]]]}}}"#;
    const BAD_TIMESTAMP: &str = r#"{"id_str":"3","timestamp_ms":"soon","place":null}"#;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("geotweet_pipeline_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("data")).unwrap();
        dir
    }

    fn write_input(dir: &Path, name: &str, lines: &[&str]) {
        std::fs::write(dir.join("data").join(name), lines.join("\n")).unwrap();
    }

    #[test]
    fn initialize_queues_inputs_and_clears_logs() {
        let dir = scratch("init");
        write_input(&dir, "b.json", &[NULL_PLACE]);
        write_input(&dir, "a.json", &[CITY]);
        std::fs::write(dir.join("data").join("readme.md"), "").unwrap();

        let logs = dir.join("logs");
        let reports = ReportLog::new(&logs);
        reports
            .append_cleaning(&CleaningReport::new("old.json"))
            .unwrap();

        let names = initialize(&dir.join("data"), &logs).unwrap();

        assert_eq!(names, vec!["a.json", "b.json"]);
        assert_eq!(FileWorkQueue::open(&logs).pending().unwrap(), names);
        assert_eq!(std::fs::read_to_string(reports.cleaning_path()).unwrap(), "");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn processes_queue_into_document_store() {
        let dir = scratch("run");
        write_input(&dir, "a.json", &[NULL_PLACE, CITY]);
        write_input(&dir, "b.json", &[BAD_TIMESTAMP, "", NULL_PLACE]);

        let mut queue = MemoryWorkQueue::new(["a.json".to_string(), "b.json".to_string()]);
        let mut store = DocumentStore::open(IN_MEMORY, "records").unwrap();
        let reports = ReportLog::new(&dir.join("logs"));

        let summary = run_pending(
            &mut queue,
            &mut store,
            &reports,
            &dir.join("data"),
            LoadMode::Single,
            None,
            &null_progress(),
            &|_| null_progress(),
        )
        .await
        .unwrap();

        assert!(queue.pending().unwrap().is_empty());
        assert_eq!(summary.files.len(), 2);
        assert_eq!(summary.files[0].records_loaded, 2);
        assert_eq!(summary.files[1].records_read, 2);
        assert_eq!(summary.files[1].records_rejected, 1);

        // "1" appears in both files and is replaced, not duplicated.
        assert_eq!(store.count().unwrap(), 2);

        let loads = reports.load_reports().unwrap();
        assert_eq!(loads.len(), 2);
        assert_eq!(loads[0].file_name, "a.json");
        assert_eq!(loads[0].success_count, 2);

        let cleaning = std::fs::read_to_string(reports.cleaning_path()).unwrap();
        let first: CleaningReport =
            serde_json::from_str(cleaning.lines().next().unwrap()).unwrap();
        assert_eq!(first.null_places_fixed, vec!["1"]);
        assert!(first.bounding_boxes_fixed.contains(&"1".to_string()));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unreadable_file_stays_queued() {
        let dir = scratch("stop");
        write_input(&dir, "a.json", &[NULL_PLACE]);
        write_input(&dir, "b.json", &["{not json"]);
        write_input(&dir, "c.json", &[CITY]);

        let mut queue = MemoryWorkQueue::new(
            ["a.json", "b.json", "c.json"].map(ToString::to_string),
        );
        let mut store = DocumentStore::open(IN_MEMORY, "records").unwrap();
        let reports = ReportLog::new(&dir.join("logs"));

        let result = run_pending(
            &mut queue,
            &mut store,
            &reports,
            &dir.join("data"),
            LoadMode::Bulk,
            None,
            &null_progress(),
            &|_| null_progress(),
        )
        .await;

        assert!(matches!(result, Err(IngestError::Source(_))));
        assert_eq!(queue.pending().unwrap(), vec!["b.json", "c.json"]);
        assert_eq!(store.count().unwrap(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn max_files_limits_the_run() {
        let dir = scratch("limit");
        write_input(&dir, "a.json", &[NULL_PLACE]);
        write_input(&dir, "b.json", &[CITY]);

        let mut queue = MemoryWorkQueue::new(["a.json", "b.json"].map(ToString::to_string));
        let mut store = DocumentStore::open(IN_MEMORY, "records").unwrap();

        let summary = run_pending(
            &mut queue,
            &mut store,
            &ReportLog::new(&dir.join("logs")),
            &dir.join("data"),
            LoadMode::Bulk,
            Some(1),
            &null_progress(),
            &|_| null_progress(),
        )
        .await
        .unwrap();

        assert_eq!(summary.files.len(), 1);
        assert_eq!(queue.pending().unwrap(), vec!["b.json"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn cleans_to_ndjson() {
        let dir = scratch("clean");
        write_input(&dir, "a.json", &[NULL_PLACE, BAD_TIMESTAMP, CITY]);

        let mut out = Vec::new();
        let report = clean_to_writer(&dir.join("data").join("a.json"), &mut out).unwrap();

        assert_eq!(report.file_name, "a.json");
        assert_eq!(report.rejected.len(), 1);

        let text = String::from_utf8(out).unwrap();
        let ids: Vec<String> = text
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["id_str"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(ids, vec!["1", "2"]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
