//! Canonicalization of record identifiers and timestamps.
//!
//! Identifiers arrive as strings or integers; timestamps as integers,
//! integral floats, or numeric strings. When `timestamp_ms` is absent the
//! `created_at` string is parsed instead.

use chrono::DateTime;
use serde_json::{Map, Value};

use crate::TypeCoercionError;

/// Format of the `created_at` field, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
pub const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Coerces the record identifier to a string.
///
/// Uses `id_str` when present, falling back to the numeric `id` field.
///
/// # Errors
///
/// Returns [`TypeCoercionError`] if neither field is present, or the value
/// is not a non-empty string or an integer.
pub fn coerce_id(
    id_str: Option<&Value>,
    extra: &Map<String, Value>,
) -> Result<String, TypeCoercionError> {
    let value = present(id_str)
        .or_else(|| present(extra.get("id")))
        .ok_or(TypeCoercionError::Missing { field: "id_str" })?;

    let invalid = || TypeCoercionError::Invalid {
        field: "id_str",
        value: value.to_string(),
        expected: "string identifier",
    };

    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        _ => Err(invalid()),
    }
}

/// Coerces the record timestamp to integer milliseconds since the epoch.
///
/// # Errors
///
/// Returns [`TypeCoercionError`] if neither `timestamp_ms` nor a parseable
/// `created_at` is present, or `timestamp_ms` is not integral.
pub fn coerce_timestamp(
    timestamp_ms: Option<&Value>,
    extra: &Map<String, Value>,
) -> Result<i64, TypeCoercionError> {
    let Some(value) = present(timestamp_ms) else {
        return extra
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(parse_created_at)
            .ok_or(TypeCoercionError::Missing {
                field: "timestamp_ms",
            });
    };

    let millis = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    };

    millis.ok_or_else(|| TypeCoercionError::Invalid {
        field: "timestamp_ms",
        value: value.to_string(),
        expected: "integer milliseconds",
    })
}

/// Parses a `created_at` string into epoch milliseconds.
#[must_use]
pub fn parse_created_at(s: &str) -> Option<i64> {
    DateTime::parse_from_str(s.trim(), CREATED_AT_FORMAT)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

#[allow(clippy::cast_possible_truncation)]
fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15).then_some(f as i64)
}
