#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Backend configuration and load report types.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The kinds of store cleaned records can be loaded into.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackendKind {
    /// Embedded `DuckDB` table of JSON documents.
    DocumentStore,
    /// Neo4j graph database.
    Graph,
    /// Embedded Tantivy full-text index.
    SearchIndex,
}

fn default_table() -> String {
    "records".to_string()
}

fn default_password_env() -> String {
    "NEO4J_PASSWORD".to_string()
}

const fn default_writer_heap_bytes() -> usize {
    50_000_000
}

/// Connection settings for one backend, tagged by `type` in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    DocumentStore {
        /// Database file, or `:memory:`.
        path: String,
        #[serde(default = "default_table")]
        table: String,
    },
    Graph {
        /// Bolt URI, e.g. `bolt://localhost:7687`.
        uri: String,
        user: String,
        /// Environment variable holding the password.
        #[serde(default = "default_password_env")]
        password_env: String,
    },
    SearchIndex {
        /// Index directory, created if missing.
        path: String,
        /// Tantivy writer heap size in bytes.
        #[serde(default = "default_writer_heap_bytes")]
        writer_heap_bytes: usize,
    },
}

impl BackendConfig {
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::DocumentStore { .. } => BackendKind::DocumentStore,
            Self::Graph { .. } => BackendKind::Graph,
            Self::SearchIndex { .. } => BackendKind::SearchIndex,
        }
    }
}

/// Whether records are written one call per record or as one batch.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoadMode {
    Single,
    #[default]
    Bulk,
}

/// A record the backend refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub id: String,
    pub error: String,
}

/// Outcome of loading one file, written as a JSON line to
/// `loaded_files.txt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub file_name: String,
    /// Wall-clock seconds spent writing to the backend.
    pub load_time: f64,
    pub success_count: u64,
    pub fail_count: u64,
    pub fail_log: Vec<LoadFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn backend_config_from_toml_uses_defaults() {
        let config: BackendConfig = toml::from_str(
            r#"
            type = "graph"
            uri = "bolt://localhost:7687"
            user = "neo4j"
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            BackendConfig::Graph {
                uri: "bolt://localhost:7687".to_string(),
                user: "neo4j".to_string(),
                password_env: "NEO4J_PASSWORD".to_string(),
            }
        );
        assert_eq!(config.kind(), BackendKind::Graph);
    }

    #[test]
    fn search_index_heap_default() {
        let config: BackendConfig =
            toml::from_str("type = \"search_index\"\npath = \"data/index\"").unwrap();
        assert_eq!(
            config,
            BackendConfig::SearchIndex {
                path: "data/index".to_string(),
                writer_heap_bytes: 50_000_000,
            }
        );
    }

    #[test]
    fn unknown_backend_type_is_rejected() {
        let result: Result<BackendConfig, _> = toml::from_str("type = \"mongo\"\npath = \"x\"");
        assert!(result.is_err());
    }

    #[test]
    fn backend_kind_strings() {
        assert_eq!(BackendKind::DocumentStore.to_string(), "document_store");
        assert_eq!(
            BackendKind::from_str("search_index").unwrap(),
            BackendKind::SearchIndex
        );
        assert_eq!(LoadMode::from_str("single").unwrap(), LoadMode::Single);
        assert_eq!(LoadMode::default(), LoadMode::Bulk);
    }

    #[test]
    fn load_report_line_shape() {
        let report = LoadReport {
            file_name: "f.json".to_string(),
            load_time: 1.5,
            success_count: 1,
            fail_count: 1,
            fail_log: vec![LoadFailure {
                id: "2".to_string(),
                error: "duplicate".to_string(),
            }],
        };

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "file_name": "f.json",
                "load_time": 1.5,
                "success_count": 1,
                "fail_count": 1,
                "fail_log": [{"id": "2", "error": "duplicate"}]
            })
        );
    }
}
