//! Place substitution and bounding-box regularization.
//!
//! Upstream places always carry four unclosed corners. Storage and query
//! engines want closed rings, and point-of-interest places report
//! zero-area boxes that have to be inflated before geometric indexing.

use geotweet_record_models::{Place, Polygon, Position, RawPlace};
use serde_json::{Map, Value};

use crate::centroid::Centroid;

/// Half-width, in degrees, of the square synthesized around point-like
/// places.
pub const POINT_BUFFER_DEGREES: f64 = 0.0001;

/// Place types whose bounding box is a single point.
pub const POINT_LIKE_PLACE_TYPES: &[&str] = &["poi", DEFAULT_PLACE_TYPE];

/// Minimum number of positions an input ring needs to be usable.
pub const MIN_RING_POSITIONS: usize = 4;

pub const DEFAULT_PLACE_ID: &str = "9999999";
pub const DEFAULT_PLACE_NAME: &str = "No Place";
pub const DEFAULT_PLACE_FULL_NAME: &str = "No Place Available";
pub const DEFAULT_PLACE_COUNTRY: &str = "No Country Available";
pub const DEFAULT_PLACE_COUNTRY_CODE: &str = "ZZ";
pub const DEFAULT_PLACE_TYPE: &str = "NA";
pub const DEFAULT_PLACE_URL: &str = "NA";

/// A place with a validated original box and its repaired ring, still
/// waiting for centroid geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairedPlace {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub country: String,
    pub country_code: String,
    pub place_type: String,
    pub bounding_box: Polygon,
    pub repaired_bounding_box: Polygon,
    pub extra: Map<String, Value>,
}

impl RepairedPlace {
    /// Attaches centroid geometry, producing the final [`Place`].
    #[must_use]
    pub fn into_place(self, centroid: Centroid) -> Place {
        Place {
            id: self.id,
            name: self.name,
            full_name: self.full_name,
            country: self.country,
            country_code: self.country_code,
            place_type: self.place_type,
            bounding_box: self.bounding_box,
            repaired_bounding_box: self.repaired_bounding_box,
            centroid: geotweet_record_models::Point::new(centroid.position),
            centroid_hash: centroid.hash,
            extra: self.extra,
        }
    }
}

/// Outcome of [`repair`].
#[derive(Debug, Clone, PartialEq)]
pub struct Repair {
    pub place: RepairedPlace,
    /// The place was missing or unusable and the default was substituted.
    pub default_substituted: bool,
    /// The box was inflated around its anchor point.
    pub box_regularized: bool,
}

/// Repairs an optional raw place into one with a closed, valid ring.
///
/// A missing place, a null bounding box, or a bounding box that is not a
/// polygon of at least [`MIN_RING_POSITIONS`] in-range positions is
/// replaced by the default place. The default place type is point-like, so
/// a substituted place is always regularized as well.
#[must_use]
pub fn repair(place: Option<RawPlace>) -> Repair {
    let (place_type, bounding_box, fields, default_substituted) =
        match place.and_then(split_usable) {
            Some((place_type, bounding_box, fields)) => (place_type, bounding_box, fields, false),
            None => {
                let (place_type, bounding_box, fields) = default_place();
                (place_type, bounding_box, fields, true)
            }
        };

    let (repaired_bounding_box, box_regularized) = regularize(&place_type, &bounding_box);

    let PlaceFields {
        id,
        name,
        full_name,
        country,
        country_code,
        extra,
    } = fields;

    Repair {
        place: RepairedPlace {
            id,
            name,
            full_name,
            country,
            country_code,
            place_type,
            bounding_box,
            repaired_bounding_box,
            extra,
        },
        default_substituted,
        box_regularized,
    }
}

/// Regularizes a validated box into a closed ring.
///
/// Point-like place types get a square of half-width
/// [`POINT_BUFFER_DEGREES`] around the first position and report `true`.
/// Everything else is closed by repeating its first position, unless it
/// already has more than [`MIN_RING_POSITIONS`] positions and is closed.
#[must_use]
pub fn regularize(place_type: &str, bounding_box: &Polygon) -> (Polygon, bool) {
    let ring = bounding_box.ring();

    match ring.first() {
        Some(anchor) if is_point_like(place_type) => (point_box(*anchor), true),
        _ => (close_ring(bounding_box), false),
    }
}

/// Returns `true` for place types whose box is treated as a point.
#[must_use]
pub fn is_point_like(place_type: &str) -> bool {
    POINT_LIKE_PLACE_TYPES.contains(&place_type)
}

/// Builds the closed five-position square around `anchor`.
///
/// Corner order is lower-left, upper-left, upper-right, lower-right,
/// lower-left, so indices 0 and 2 are opposite corners.
#[must_use]
pub fn point_box(anchor: Position) -> Polygon {
    let e = POINT_BUFFER_DEGREES;
    let lower_left = Position::new(anchor.lon - e, anchor.lat - e);

    Polygon::from_ring(vec![
        lower_left,
        Position::new(anchor.lon - e, anchor.lat + e),
        Position::new(anchor.lon + e, anchor.lat + e),
        Position::new(anchor.lon + e, anchor.lat - e),
        lower_left,
    ])
}

/// Closes the bounding ring by appending its first position.
///
/// A four-position ring is always extended to five, even when its first and
/// last positions already coincide.
#[must_use]
pub fn close_ring(bounding_box: &Polygon) -> Polygon {
    let mut ring = bounding_box.ring().to_vec();
    if ring.len() <= MIN_RING_POSITIONS || !bounding_box.is_closed() {
        if let Some(first) = ring.first().copied() {
            ring.push(first);
        }
    }
    Polygon::from_ring(ring)
}

/// Parses a raw bounding box, returning `None` unless it is a polygon whose
/// first ring has at least [`MIN_RING_POSITIONS`] valid positions.
#[must_use]
pub fn parse_bounding_box(value: &Value) -> Option<Polygon> {
    let polygon: Polygon = serde_json::from_value(value.clone()).ok()?;
    let ring = polygon.ring();

    if ring.len() < MIN_RING_POSITIONS || !ring.iter().all(Position::is_valid) {
        return None;
    }

    Some(polygon)
}

/// Descriptive place fields carried through repair unchanged.
struct PlaceFields {
    id: String,
    name: String,
    full_name: String,
    country: String,
    country_code: String,
    extra: Map<String, Value>,
}

fn split_usable(raw: RawPlace) -> Option<(String, Polygon, PlaceFields)> {
    let bounding_box = raw.bounding_box.as_ref().and_then(parse_bounding_box)?;

    let mut extra = raw.extra;
    for field in Place::DERIVED_FIELDS {
        extra.remove(*field);
    }

    Some((
        scalar_text(raw.place_type),
        bounding_box,
        PlaceFields {
            id: scalar_text(raw.id),
            name: scalar_text(raw.name),
            full_name: scalar_text(raw.full_name),
            country: scalar_text(raw.country),
            country_code: scalar_text(raw.country_code),
            extra,
        },
    ))
}

fn default_place() -> (String, Polygon, PlaceFields) {
    let mut extra = Map::new();
    extra.insert("url".to_string(), Value::from(DEFAULT_PLACE_URL));

    (
        DEFAULT_PLACE_TYPE.to_string(),
        Polygon::from_ring(vec![Position::new(0.0, 0.0); MIN_RING_POSITIONS]),
        PlaceFields {
            id: DEFAULT_PLACE_ID.to_string(),
            name: DEFAULT_PLACE_NAME.to_string(),
            full_name: DEFAULT_PLACE_FULL_NAME.to_string(),
            country: DEFAULT_PLACE_COUNTRY.to_string(),
            country_code: DEFAULT_PLACE_COUNTRY_CODE.to_string(),
            extra,
        },
    )
}

/// Stringifies a JSON scalar; anything else becomes the empty string.
fn scalar_text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EPS: f64 = 1e-12;

    fn city_place() -> RawPlace {
        serde_json::from_value(json!({
            "id": "01a9a39529b27f36",
            "name": "Manhattan",
            "full_name": "Manhattan, NY",
            "country": "United States",
            "country_code": "US",
            "place_type": "city",
            "url": "https://api.twitter.com/1.1/geo/id/01a9a39529b27f36.json",
            "bounding_box": {
                "type": "Polygon",
                "coordinates": [[
                    [-74.026675, 40.683935],
                    [-74.026675, 40.877483],
                    [-73.910408, 40.877483],
                    [-73.910408, 40.683935]
                ]]
            }
        }))
        .unwrap()
    }

    fn poi_place(lon: f64, lat: f64) -> RawPlace {
        serde_json::from_value(json!({
            "id": "07d9cd6afd884001",
            "name": "Central Park",
            "full_name": "Central Park",
            "country": "United States",
            "country_code": "US",
            "place_type": "poi",
            "bounding_box": {
                "type": "Polygon",
                "coordinates": [[[lon, lat], [lon, lat], [lon, lat], [lon, lat]]]
            }
        }))
        .unwrap()
    }

    #[test]
    fn missing_place_gets_default() {
        let repair = repair(None);

        assert!(repair.default_substituted);
        assert!(repair.box_regularized);
        assert_eq!(repair.place.id, DEFAULT_PLACE_ID);
        assert_eq!(repair.place.name, DEFAULT_PLACE_NAME);
        assert_eq!(repair.place.full_name, DEFAULT_PLACE_FULL_NAME);
        assert_eq!(repair.place.country, DEFAULT_PLACE_COUNTRY);
        assert_eq!(repair.place.country_code, DEFAULT_PLACE_COUNTRY_CODE);
        assert_eq!(repair.place.place_type, DEFAULT_PLACE_TYPE);
        assert_eq!(repair.place.extra.get("url"), Some(&json!("NA")));
        assert_eq!(
            repair.place.bounding_box.ring(),
            &[Position::new(0.0, 0.0); 4][..]
        );
    }

    #[test]
    fn null_bounding_box_gets_default() {
        let mut place = city_place();
        place.bounding_box = None;

        let repair = repair(Some(place));
        assert!(repair.default_substituted);
        assert_eq!(repair.place.place_type, DEFAULT_PLACE_TYPE);
        assert_eq!(repair.place.name, DEFAULT_PLACE_NAME);
    }

    #[test]
    fn unusable_bounding_boxes_get_default() {
        let bad_boxes = [
            json!({"type": "Polygon", "coordinates": [[[1.0, 1.0], [2.0, 2.0]]]}),
            json!({"type": "Polygon", "coordinates": []}),
            json!({"type": "Point", "coordinates": [1.0, 1.0]}),
            json!({"type": "Polygon", "coordinates": [[[200.0, 1.0], [1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]]}),
            json!("not a box"),
        ];

        for bad in bad_boxes {
            let mut place = city_place();
            place.bounding_box = Some(bad.clone());
            let repair = repair(Some(place));
            assert!(repair.default_substituted, "{bad} should be unusable");
        }
    }

    #[test]
    fn city_box_is_closed_without_flags() {
        let repair = repair(Some(city_place()));

        assert!(!repair.default_substituted);
        assert!(!repair.box_regularized);

        let original = repair.place.bounding_box.ring().to_vec();
        let ring = repair.place.repaired_bounding_box.ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(&ring[..4], &original[..]);
        assert_eq!(ring[4], ring[0]);
        assert_eq!(repair.place.name, "Manhattan");
        assert!(repair.place.extra.contains_key("url"));
    }

    #[test]
    fn already_closed_box_is_not_closed_twice() {
        let closed = Polygon::from_ring(vec![
            Position::new(1.0, 1.0),
            Position::new(1.0, 2.0),
            Position::new(2.0, 2.0),
            Position::new(2.0, 1.0),
            Position::new(1.0, 1.0),
        ]);
        let (repaired, regularized) = regularize("city", &closed);
        assert!(!regularized);
        assert_eq!(repaired, closed);
    }

    #[test]
    fn closed_four_position_box_still_gets_fifth_position() {
        let closed = Polygon::from_ring(vec![
            Position::new(0.0, 0.0),
            Position::new(0.0, 1.0),
            Position::new(1.0, 1.0),
            Position::new(0.0, 0.0),
        ]);
        let (repaired, regularized) = regularize("city", &closed);
        assert!(!regularized);
        let ring = repaired.ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(&ring[..4], closed.ring());
        assert_eq!(ring[4], ring[0]);
    }

    #[test]
    fn degenerate_city_box_gets_five_positions() {
        let mut place = city_place();
        place.bounding_box = Some(json!({
            "type": "Polygon",
            "coordinates": [[[1.0, 1.0], [1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]]
        }));

        let repair = repair(Some(place));
        assert!(!repair.default_substituted);
        assert!(!repair.box_regularized);
        let ring = repair.place.repaired_bounding_box.ring();
        assert_eq!(ring.len(), 5);
        assert!(ring.iter().all(|p| *p == Position::new(1.0, 1.0)));
    }

    #[test]
    fn poi_box_is_inflated_around_anchor() {
        let repair = repair(Some(poi_place(-73.9654, 40.7829)));

        assert!(!repair.default_substituted);
        assert!(repair.box_regularized);

        let ring = repair.place.repaired_bounding_box.ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);

        let width = ring[2].lon - ring[0].lon;
        let height = ring[2].lat - ring[0].lat;
        assert!((width - 0.0002).abs() < EPS, "width {width}");
        assert!((height - 0.0002).abs() < EPS, "height {height}");

        let center_lon = ring[0].lon + width / 2.0;
        let center_lat = ring[0].lat + height / 2.0;
        assert!((center_lon - -73.9654).abs() < EPS);
        assert!((center_lat - 40.7829).abs() < EPS);
    }

    #[test]
    fn point_box_corner_order() {
        let ring = point_box(Position::new(10.0, 20.0)).ring().to_vec();
        let e = POINT_BUFFER_DEGREES;

        assert_eq!(ring[0], Position::new(10.0 - e, 20.0 - e));
        assert_eq!(ring[1], Position::new(10.0 - e, 20.0 + e));
        assert_eq!(ring[2], Position::new(10.0 + e, 20.0 + e));
        assert_eq!(ring[3], Position::new(10.0 + e, 20.0 - e));
        assert_eq!(ring[4], ring[0]);
    }

    #[test]
    fn point_box_has_expected_area() {
        use geo::Area;

        let polygon = point_box(Position::new(-0.1276, 51.5072)).to_geo();
        let expected = (2.0 * POINT_BUFFER_DEGREES).powi(2);
        assert!((polygon.unsigned_area() - expected).abs() < 1e-15);
    }

    #[test]
    fn derived_fields_are_dropped_from_raw_extras() {
        let mut place = city_place();
        place
            .extra
            .insert("centroid_hash".to_string(), json!("dr5ru"));

        let repair = repair(Some(place));
        assert!(!repair.place.extra.contains_key("centroid_hash"));
    }

    #[test]
    fn numeric_place_id_is_stringified() {
        let mut place = city_place();
        place.id = Some(json!(12345));
        assert_eq!(repair(Some(place)).place.id, "12345");
    }
}
