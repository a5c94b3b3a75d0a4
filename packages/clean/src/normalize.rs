//! Single-record normalization.

use geotweet_record_models::{RawRecord, Record};

use crate::{CleanError, centroid, coerce, repair};

/// A cleaned record plus the repairs that fired while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub record: Record,
    /// The default place was substituted.
    pub null_place_fixed: bool,
    /// The bounding box was inflated around a point.
    pub bounding_box_fixed: bool,
}

/// Normalizes one raw record into a cleaned [`Record`].
///
/// Geodata problems are always repaired. Derived geometry is recomputed
/// from the original `bounding_box`, so normalizing an already-cleaned
/// record yields the same repaired box, centroid, and hash.
///
/// # Errors
///
/// Returns [`CleanError::Coercion`] if the identifier or timestamp cannot
/// be coerced.
pub fn normalize(raw: RawRecord) -> Result<NormalizedRecord, CleanError> {
    let RawRecord {
        id_str,
        timestamp_ms,
        place,
        extra,
    } = raw;

    let id = coerce::coerce_id(id_str.as_ref(), &extra)?;
    let timestamp = coerce::coerce_timestamp(timestamp_ms.as_ref(), &extra)?;

    let repair = repair::repair(place);
    if repair.default_substituted {
        log::debug!("Record {id}: substituted default place");
    }
    if repair.box_regularized {
        log::debug!(
            "Record {id}: inflated {} box around its anchor",
            repair.place.place_type
        );
    }

    let centroid = centroid::derive(&repair.place.repaired_bounding_box)?;

    Ok(NormalizedRecord {
        record: Record {
            id,
            timestamp,
            place: repair.place.into_place(centroid),
            extra,
        },
        null_place_fixed: repair.default_substituted,
        bounding_box_fixed: repair.box_regularized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotweet_record_models::Position;
    use serde_json::json;

    const EPS: f64 = 1e-9;

    fn raw(value: serde_json::Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    fn city_tweet() -> RawRecord {
        raw(json!({
            "id_str": "1050118621198921728",
            "timestamp_ms": "1539202764657",
            "text": "Fall in the city",
            "place": {
                "id": "01a9a39529b27f36",
                "name": "Manhattan",
                "full_name": "Manhattan, NY",
                "country": "United States",
                "country_code": "US",
                "place_type": "city",
                "bounding_box": {
                    "type": "Polygon",
                    "coordinates": [[
                        [-74.026675, 40.683935],
                        [-74.026675, 40.877483],
                        [-73.910408, 40.877483],
                        [-73.910408, 40.683935]
                    ]]
                }
            }
        }))
    }

    #[test]
    fn null_place_end_to_end() {
        let normalized =
            normalize(raw(json!({"id_str": "1", "timestamp_ms": "1000", "place": null}))).unwrap();

        assert!(normalized.null_place_fixed);
        assert!(normalized.bounding_box_fixed);

        let record = normalized.record;
        assert_eq!(record.id, "1");
        assert_eq!(record.timestamp, 1000);
        assert_eq!(record.place.place_type, "NA");
        assert_eq!(
            record.place.bounding_box.ring(),
            &[Position::new(0.0, 0.0); 4][..]
        );

        let ring = record.place.repaired_bounding_box.ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], Position::new(-0.0001, -0.0001));
        assert_eq!(ring[2], Position::new(0.0001, 0.0001));
        assert_eq!(ring[0], ring[4]);

        let centroid = record.place.centroid.coordinates;
        assert!(centroid.lon.abs() < EPS);
        assert!(centroid.lat.abs() < EPS);
        assert_eq!(record.place.centroid_hash.len(), 12);
    }

    #[test]
    fn missing_place_key_is_fixed() {
        let normalized = normalize(raw(json!({"id_str": "7", "timestamp_ms": 5}))).unwrap();
        assert!(normalized.null_place_fixed);
        assert_eq!(normalized.record.place.id, "9999999");
    }

    #[test]
    fn city_place_end_to_end() {
        let normalized = normalize(city_tweet()).unwrap();

        assert!(!normalized.null_place_fixed);
        assert!(!normalized.bounding_box_fixed);

        let place = &normalized.record.place;
        let original = place.bounding_box.ring();
        let ring = place.repaired_bounding_box.ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(&ring[..4], original);
        assert_eq!(ring[4], original[0]);

        let centroid = place.centroid.coordinates;
        assert!((centroid.lon - (-74.026675 + (-73.910408 + 74.026675) / 2.0)).abs() < EPS);
        assert!((centroid.lat - (40.683935 + (40.877483 - 40.683935) / 2.0)).abs() < EPS);
        assert_eq!(
            normalized.record.text(),
            Some("Fall in the city")
        );
    }

    #[test]
    fn normalizing_a_cleaned_record_is_idempotent() {
        for input in [
            city_tweet(),
            raw(json!({"id_str": "1", "timestamp_ms": "1000", "place": null})),
        ] {
            let first = normalize(input).unwrap().record;
            let reparsed: RawRecord =
                serde_json::from_value(serde_json::to_value(&first).unwrap()).unwrap();
            let second = normalize(reparsed).unwrap().record;

            assert_eq!(
                first.place.repaired_bounding_box,
                second.place.repaired_bounding_box
            );
            assert_eq!(first.place.centroid, second.place.centroid);
            assert_eq!(first.place.centroid_hash, second.place.centroid_hash);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn coercion_failure_is_reported() {
        let result = normalize(raw(json!({"timestamp_ms": "1000", "place": null})));
        assert!(matches!(result, Err(CleanError::Coercion(_))));
    }

    #[test]
    fn serialized_record_uses_wire_names() {
        let record = normalize(city_tweet()).unwrap().record;
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["id_str"], json!("1050118621198921728"));
        assert_eq!(value["timestamp_ms"], json!(1_539_202_764_657_i64));
        assert_eq!(value["place"]["repaired_bounding_box"]["type"], json!("Polygon"));
        assert_eq!(value["place"]["centroid"]["type"], json!("Point"));
        assert!(value["place"]["centroid_hash"].is_string());
    }
}
