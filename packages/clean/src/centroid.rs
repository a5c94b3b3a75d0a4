//! Centroid and geohash derivation for repaired bounding boxes.

use geotweet_record_models::{Polygon, Position};

use crate::CentroidError;

/// Geohash length attached to every cleaned place.
pub const GEOHASH_PRECISION: usize = 12;

/// Centroid of a repaired box and its geohash.
#[derive(Debug, Clone, PartialEq)]
pub struct Centroid {
    pub position: Position,
    pub hash: String,
}

/// Derives the centroid of a closed, axis-aligned ring.
///
/// Index 0 is taken as the lower-left corner and index 2 as the
/// upper-right. Both repair branches produce rings in that order.
///
/// # Errors
///
/// Returns [`CentroidError::DegenerateRing`] if the ring has no index 2,
/// or [`CentroidError::Geohash`] if the centroid falls outside the WGS84
/// ranges.
pub fn derive(repaired_bounding_box: &Polygon) -> Result<Centroid, CentroidError> {
    let ring = repaired_bounding_box.ring();
    let (Some(lower_left), Some(upper_right)) = (ring.first(), ring.get(2)) else {
        return Err(CentroidError::DegenerateRing { len: ring.len() });
    };

    let position = Position::new(
        lower_left.lon + (upper_right.lon - lower_left.lon) / 2.0,
        lower_left.lat + (upper_right.lat - lower_left.lat) / 2.0,
    );

    Ok(Centroid {
        hash: spatial_hash(position)?,
        position,
    })
}

/// Encodes a position as a precision-[`GEOHASH_PRECISION`] geohash.
///
/// # Errors
///
/// Returns [`CentroidError::Geohash`] for out-of-range coordinates.
pub fn spatial_hash(position: Position) -> Result<String, CentroidError> {
    geohash::encode(
        geohash::Coord {
            x: position.lon,
            y: position.lat,
        },
        GEOHASH_PRECISION,
    )
    .map_err(|e| CentroidError::Geohash {
        message: e.to_string(),
    })
}
