#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tweet record, place, and geometry types.
//!
//! Records arrive as [`RawRecord`] values straight from newline-delimited
//! JSON and leave the cleaning step as [`Record`] values whose [`Place`] is
//! always present and carries a closed `repaired_bounding_box`, a centroid,
//! and a geohash. Geometry is kept in `GeoJSON` shape so the cleaned
//! documents can be handed to any backing store unchanged.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single `[longitude, latitude]` coordinate pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Position {
    /// Longitude in degrees (x).
    pub lon: f64,
    /// Latitude in degrees (y).
    pub lat: f64,
}

impl Position {
    /// Creates a position from longitude and latitude.
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Returns `true` if both components are finite and inside the WGS84
    /// longitude/latitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

impl From<[f64; 2]> for Position {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Position> for [f64; 2] {
    fn from(position: Position) -> Self {
        [position.lon, position.lat]
    }
}

impl From<Position> for geo::Coord<f64> {
    fn from(position: Position) -> Self {
        geo::coord! { x: position.lon, y: position.lat }
    }
}

/// `GeoJSON` geometry tag for [`Polygon`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolygonType {
    #[default]
    Polygon,
}

/// `GeoJSON` geometry tag for [`Point`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointType {
    #[default]
    Point,
}

/// A `GeoJSON` polygon. Place bounding boxes only ever use the first ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    #[serde(rename = "type", default)]
    pub kind: PolygonType,
    pub coordinates: Vec<Vec<Position>>,
}

impl Polygon {
    /// Wraps a single linear ring.
    #[must_use]
    pub fn from_ring(ring: Vec<Position>) -> Self {
        Self {
            kind: PolygonType::Polygon,
            coordinates: vec![ring],
        }
    }

    /// Returns the bounding ring (the first ring), or an empty slice if the
    /// polygon has no rings.
    #[must_use]
    pub fn ring(&self) -> &[Position] {
        self.coordinates.first().map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if the bounding ring has at least two positions and
    /// its first and last positions are identical.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.ring().len() >= 2 && self.to_line_string().is_closed()
    }

    /// Converts the bounding ring into a [`geo::LineString`].
    #[must_use]
    pub fn to_line_string(&self) -> geo::LineString<f64> {
        self.ring().iter().map(|p| geo::Coord::from(*p)).collect()
    }

    /// Converts the bounding ring into a [`geo::Polygon`] with no holes.
    #[must_use]
    pub fn to_geo(&self) -> geo::Polygon<f64> {
        geo::Polygon::new(self.to_line_string(), vec![])
    }
}

/// A `GeoJSON` point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "type", default)]
    pub kind: PointType,
    pub coordinates: Position,
}

impl Point {
    #[must_use]
    pub const fn new(position: Position) -> Self {
        Self {
            kind: PointType::Point,
            coordinates: position,
        }
    }
}

/// A place as it appears in raw input.
///
/// Every field is optional: places arrive null, partially populated, or
/// with a bounding box that is not a usable polygon. Text fields are kept
/// as raw JSON scalars and stringified during cleaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlace {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub full_name: Option<Value>,
    #[serde(default)]
    pub country: Option<Value>,
    #[serde(default)]
    pub country_code: Option<Value>,
    #[serde(default)]
    pub place_type: Option<Value>,
    /// Original bounding box, validated during cleaning.
    #[serde(default)]
    pub bounding_box: Option<Value>,
    /// Everything else (`url`, `attributes`, fields derived by a previous
    /// cleaning pass, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A cleaned place. Always carries valid derived geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub country: String,
    pub country_code: String,
    pub place_type: String,
    /// The bounding box as supplied (or the synthesized default), kept as
    /// evidence. All derived geometry is recomputed from this.
    pub bounding_box: Polygon,
    /// Closed (and, for point-like places, inflated) bounding ring.
    pub repaired_bounding_box: Polygon,
    pub centroid: Point,
    /// Precision-12 geohash of [`Place::centroid`].
    pub centroid_hash: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Place {
    /// Field names written by cleaning. Stripped from a raw place's extra
    /// fields so re-cleaning a cleaned record does not duplicate them.
    pub const DERIVED_FIELDS: &'static [&'static str] =
        &["repaired_bounding_box", "centroid", "centroid_hash"];

    /// Lower-left corner of the repaired box (ring index 0).
    #[must_use]
    pub fn lower_left(&self) -> Option<Position> {
        self.repaired_bounding_box.ring().first().copied()
    }

    /// Upper-right corner of the repaired box (ring index 2).
    #[must_use]
    pub fn upper_right(&self) -> Option<Position> {
        self.repaired_bounding_box.ring().get(2).copied()
    }
}

/// A record as read from an input file, before any coercion or repair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id_str: Option<Value>,
    #[serde(default)]
    pub timestamp_ms: Option<Value>,
    /// `None` when the place is null, absent, or not a JSON object.
    #[serde(default, deserialize_with = "place_object")]
    pub place: Option<RawPlace>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keeps a place only if it is a JSON object, so a malformed place is
/// repaired during cleaning instead of failing the whole line.
fn place_object<'de, D>(deserializer: D) -> Result<Option<RawPlace>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// A cleaned record, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Canonical string identifier.
    #[serde(rename = "id_str")]
    pub id: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "timestamp_ms")]
    pub timestamp: i64,
    pub place: Place,
    /// All other fields from the input object, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Looks up a nested value in the record's passthrough fields, e.g.
    /// `record.lookup(&["user", "screen_name"])`.
    #[must_use]
    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.extra.get(*first)?, |value, key| value.get(*key))
            .filter(|value| !value.is_null())
    }

    /// Looks up a nested string field.
    #[must_use]
    pub fn lookup_str(&self, path: &[&str]) -> Option<&str> {
        self.lookup(path).and_then(Value::as_str)
    }

    /// The post text, if present.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.lookup_str(&["text"])
    }
}

/// A record dropped from a batch because its identifier or timestamp could
/// not be coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Zero-based position of the record in its batch.
    pub index: usize,
    /// Identifier, when it could be recovered.
    pub id: Option<String>,
    pub error: String,
}

/// Summary of the repairs applied to one input file.
///
/// Serialized as one JSON line in the cleaning log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub file_name: String,
    /// Records whose place was missing or unusable and replaced by the
    /// default place.
    pub null_places_fixed: Vec<String>,
    /// Records whose box was inflated around a point (`poi`/`NA` places).
    pub bounding_boxes_fixed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedRecord>,
}

impl CleaningReport {
    /// Creates an empty report for `file_name`.
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }
}
