//! Whole-file cleaning and repair reporting.

use geotweet_record_models::{CleaningReport, RawRecord, Record, RejectedRecord};

use crate::{coerce, normalize::normalize};

/// The cleaned records of one input file and the report describing them.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedBatch {
    pub records: Vec<Record>,
    pub report: CleaningReport,
}

/// Cleans every record of a batch, in input order.
///
/// A record whose identifier or timestamp cannot be coerced is dropped and
/// listed under [`CleaningReport::rejected`]; the rest of the batch is
/// unaffected.
#[must_use]
pub fn clean(file_name: &str, records: Vec<RawRecord>) -> CleanedBatch {
    let mut report = CleaningReport::new(file_name);
    let mut cleaned = Vec::with_capacity(records.len());

    for (index, raw) in records.into_iter().enumerate() {
        let id_hint = coerce::coerce_id(raw.id_str.as_ref(), &raw.extra).ok();

        match normalize(raw) {
            Ok(normalized) => {
                if normalized.null_place_fixed {
                    report.null_places_fixed.push(normalized.record.id.clone());
                }
                if normalized.bounding_box_fixed {
                    report
                        .bounding_boxes_fixed
                        .push(normalized.record.id.clone());
                }
                cleaned.push(normalized.record);
            }
            Err(e) => {
                log::warn!(
                    "{file_name}: rejecting record #{index} ({}): {e}",
                    id_hint.as_deref().unwrap_or("no id")
                );
                report.rejected.push(RejectedRecord {
                    index,
                    id: id_hint,
                    error: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "Cleaned {file_name}: {} records, {} null places fixed, {} bounding boxes fixed, {} rejected",
        cleaned.len(),
        report.null_places_fixed.len(),
        report.bounding_boxes_fixed.len(),
        report.rejected.len()
    );

    CleanedBatch {
        records: cleaned,
        report,
    }
}
