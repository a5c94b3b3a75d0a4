#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geodata cleaning for tweet records.
//!
//! Turns [`RawRecord`]s into [`Record`]s in four steps:
//!
//! 1. [`coerce`] canonicalizes the identifier and timestamp.
//! 2. [`repair`] substitutes a default place when the place (or its
//!    bounding box) is missing or unusable, then closes the bounding ring,
//!    inflating point-like boxes into a small square.
//! 3. [`centroid`] derives the box centroid and its geohash.
//! 4. [`batch`] runs the above over a whole file and builds the
//!    [`CleaningReport`].
//!
//! Malformed geodata is repaired, never rejected. The only per-record
//! failure is an identifier or timestamp that cannot be coerced.

pub mod batch;
pub mod centroid;
pub mod coerce;
pub mod normalize;
pub mod repair;

pub use batch::{CleanedBatch, clean};
pub use centroid::{Centroid, derive};
pub use geotweet_record_models::{CleaningReport, RawRecord, Record};
pub use normalize::{NormalizedRecord, normalize};
pub use repair::{Repair, repair};

use thiserror::Error;

/// An identifier or timestamp that cannot be turned into its canonical type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeCoercionError {
    /// Neither the field nor any fallback field is present.
    #[error("missing field `{field}`")]
    Missing {
        /// Canonical field name.
        field: &'static str,
    },

    /// The field is present but has the wrong shape.
    #[error("cannot coerce `{field}` value {value} to {expected}")]
    Invalid {
        /// Canonical field name.
        field: &'static str,
        /// The offending value, JSON-encoded.
        value: String,
        /// Human-readable target type.
        expected: &'static str,
    },
}

/// Errors produced while deriving centroid geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CentroidError {
    /// The ring does not have the corner at index 2.
    #[error("ring has {len} positions, need at least 3")]
    DegenerateRing {
        /// Number of positions in the ring.
        len: usize,
    },

    /// The centroid could not be geohashed.
    #[error("geohash encoding failed: {message}")]
    Geohash {
        /// Error reported by the encoder.
        message: String,
    },
}

/// Errors that drop a single record from a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanError {
    #[error("Type coercion error: {0}")]
    Coercion(#[from] TypeCoercionError),

    #[error("Centroid error: {0}")]
    Centroid(#[from] CentroidError),
}
