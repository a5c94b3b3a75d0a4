#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persistence for cleaned geotweet records.
//!
//! Every backend implements [`PersistenceAdapter`]; [`connect`] picks one
//! from a [`BackendConfig`]. [`loader::load_batch`] drives an adapter over
//! a cleaned batch and produces the [`LoadReport`] for the file.
//!
//! - [`document`]: `DuckDB` table of JSON documents keyed by id
//! - [`graph`]: Neo4j tweet/user/place/hashtag graph over Bolt
//! - [`search`]: Tantivy full-text index

pub mod document;
pub mod graph;
pub mod loader;
pub mod search;

pub use geotweet_load_models::{
    BackendConfig, BackendKind, LoadFailure, LoadMode, LoadReport,
};
use geotweet_record_models::Record;

/// Errors from persistence backends.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DocumentStore(#[from] duckdb::Error),

    /// Neo4j driver error.
    #[error("Neo4j error: {0}")]
    Graph(#[from] neo4rs::Error),

    /// Tantivy error.
    #[error("Tantivy error: {0}")]
    SearchIndex(#[from] tantivy::TantivyError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The adapter was used after [`PersistenceAdapter::close`].
    #[error("Connection already closed")]
    Closed,

    /// Invalid or incomplete backend configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

/// A store cleaned records are written to.
#[async_trait::async_trait]
pub trait PersistenceAdapter: Send {
    /// Which backend this is.
    fn backend(&self) -> BackendKind;

    /// Writes one record.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the backend rejects the record or the
    /// adapter is closed.
    async fn insert_one(&mut self, record: &Record) -> Result<(), LoadError>;

    /// Writes a batch of records, returning one [`LoadFailure`] per record
    /// that could not be written. An empty result means every record was
    /// written.
    async fn insert_many(&mut self, records: &[Record]) -> Vec<LoadFailure>;

    /// Flushes and releases the connection. Further calls fail with
    /// [`LoadError::Closed`].
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the final flush fails.
    async fn close(&mut self) -> Result<(), LoadError>;
}

/// Opens the backend described by `config`.
///
/// # Errors
///
/// Returns [`LoadError`] if the backend cannot be reached or opened, or if
/// the graph password variable is unset.
pub async fn connect(config: &BackendConfig) -> Result<Box<dyn PersistenceAdapter>, LoadError> {
    log::info!("Connecting to {} backend", config.kind());

    Ok(match config {
        BackendConfig::DocumentStore { path, table } => {
            Box::new(document::DocumentStore::open(path, table)?)
        }
        BackendConfig::Graph {
            uri,
            user,
            password_env,
        } => {
            let password = std::env::var(password_env).map_err(|_| LoadError::Config {
                message: format!("environment variable {password_env} is not set"),
            })?;
            Box::new(graph::GraphStore::connect(uri, user, &password).await?)
        }
        BackendConfig::SearchIndex {
            path,
            writer_heap_bytes,
        } => Box::new(search::SearchIndexStore::open(
            std::path::Path::new(path),
            *writer_heap_bytes,
        )?),
    })
}

/// Records a failed write for `record`.
pub(crate) fn failure(record: &Record, error: &LoadError) -> LoadFailure {
    log::warn!("Failed to load record {}: {error}", record.id);
    LoadFailure {
        id: record.id.clone(),
        error: error.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod test_records {
    use geotweet_record_models::Record;
    use serde_json::json;

    /// A cleaned record as the cleaner would produce it for a small city.
    pub fn city(id: &str, text: &str) -> Record {
        serde_json::from_value(json!({
            "id_str": id,
            "timestamp_ms": 1_539_202_764_000_i64,
            "text": text,
            "user": {"id": 42, "name": "Ada", "screen_name": "ada"},
            "entities": {
                "hashtags": [{"text": "rust"}, {"text": "maps"}],
                "user_mentions": [{"id": 7, "name": "Bob", "screen_name": "bob"}]
            },
            "place": {
                "id": "c1",
                "name": "Springfield",
                "full_name": "Springfield, IL",
                "country": "United States",
                "country_code": "US",
                "place_type": "city",
                "bounding_box": {"type": "Polygon", "coordinates": [[[-89.7, 39.7], [-89.7, 39.9], [-89.5, 39.9], [-89.5, 39.7]]]},
                "repaired_bounding_box": {"type": "Polygon", "coordinates": [[[-89.7, 39.7], [-89.7, 39.9], [-89.5, 39.9], [-89.5, 39.7], [-89.7, 39.7]]]},
                "centroid": {"type": "Point", "coordinates": [-89.6, 39.8]},
                "centroid_hash": "dp0e7gkqh3n5"
            }
        }))
        .unwrap()
    }
}
