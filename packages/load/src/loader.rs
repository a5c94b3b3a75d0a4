//! Drives a [`PersistenceAdapter`] over one cleaned batch.

use std::sync::Arc;
use std::time::Instant;

use geotweet_load_models::{LoadFailure, LoadMode, LoadReport};
use geotweet_record_models::Record;
use geotweet_source::progress::LoadProgress;

use crate::PersistenceAdapter;

/// Records per `insert_many` call in bulk mode.
pub const BULK_CHUNK_SIZE: usize = 1_000;

/// Writes `records` through `adapter` and reports what happened.
///
/// In [`LoadMode::Single`] every record is a separate `insert_one` call; in
/// [`LoadMode::Bulk`] records go through `insert_many` in chunks of
/// [`BULK_CHUNK_SIZE`]. A failed record never stops the batch.
pub async fn load_batch(
    adapter: &mut dyn PersistenceAdapter,
    file_name: &str,
    records: &[Record],
    mode: LoadMode,
    progress: &Arc<dyn LoadProgress>,
) -> LoadReport {
    log::info!(
        "Loading {} records from {file_name} into {} ({mode})",
        records.len(),
        adapter.backend()
    );

    progress.begin(records.len() as u64);
    let start = Instant::now();
    let mut fail_log: Vec<LoadFailure> = Vec::new();

    match mode {
        LoadMode::Single => {
            for record in records {
                let failed = match adapter.insert_one(record).await {
                    Ok(()) => 0,
                    Err(e) => {
                        fail_log.push(crate::failure(record, &e));
                        1
                    }
                };
                progress.advance(1, failed);
            }
        }
        LoadMode::Bulk => {
            for chunk in records.chunks(BULK_CHUNK_SIZE) {
                let failures = adapter.insert_many(chunk).await;
                progress.advance(chunk.len() as u64, failures.len() as u64);
                fail_log.extend(failures);
            }
        }
    }

    let load_time = start.elapsed().as_secs_f64();
    let fail_count = fail_log.len() as u64;
    let success_count = (records.len() as u64).saturating_sub(fail_count);

    progress.finish(&format!(
        "{file_name}: {success_count} loaded, {fail_count} failed"
    ));
    log::info!(
        "Loaded {file_name}: {success_count} succeeded, {fail_count} failed in {load_time:.2}s"
    );

    LoadReport {
        file_name: file_name.to_string(),
        load_time,
        success_count,
        fail_count,
        fail_log,
    }
}
