//! Document store backed by `DuckDB`.
//!
//! Each cleaned record is stored as its full JSON document keyed by id,
//! alongside the centroid columns so spatial filters do not need to parse
//! JSON. Re-loading an id replaces the previous row.

use duckdb::Connection;
use geotweet_load_models::{BackendKind, LoadFailure};
use geotweet_record_models::Record;

use crate::{LoadError, PersistenceAdapter};

/// Path value that opens an in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// A `DuckDB` table of cleaned record documents.
pub struct DocumentStore {
    conn: Option<Connection>,
    table: String,
}

impl DocumentStore {
    /// Opens (or creates) the database at `path` and ensures `table`
    /// exists. `path` may be [`IN_MEMORY`].
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Config`] if `table` is not a plain identifier,
    /// or [`LoadError`] if the connection or schema creation fails.
    pub fn open(path: &str, table: &str) -> Result<Self, LoadError> {
        if table.is_empty()
            || !table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(LoadError::Config {
                message: format!("invalid table name: {table:?}"),
            });
        }

        let conn = if path == IN_MEMORY {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = std::path::Path::new(path)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
            {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(path)?
        };

        create_schema(&conn, table)?;
        log::info!("Opened document store {path} (table {table})");

        Ok(Self {
            conn: Some(conn),
            table: table.to_string(),
        })
    }

    fn conn(&self) -> Result<&Connection, LoadError> {
        self.conn.as_ref().ok_or(LoadError::Closed)
    }

    /// Number of stored documents.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the query fails or the store is closed.
    pub fn count(&self) -> Result<u64, LoadError> {
        let count: i64 = self.conn()?.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            duckdb::params![],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Reads back the stored document for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the query fails, the stored JSON does not
    /// parse, or the store is closed.
    pub fn get(&self, id: &str) -> Result<Option<Record>, LoadError> {
        let mut stmt = self
            .conn()?
            .prepare(&format!("SELECT document FROM {} WHERE id = ?", self.table))?;
        let mut rows = stmt.query(duckdb::params![id])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let document: String = row.get(0)?;
        Ok(Some(serde_json::from_str(&document)?))
    }

    /// Ids of documents whose centroid lies inside the given box.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the query fails or the store is closed.
    pub fn ids_within(
        &self,
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    ) -> Result<Vec<String>, LoadError> {
        let mut stmt = self.conn()?.prepare(&format!(
            "SELECT id FROM {}
             WHERE centroid_lon BETWEEN ? AND ? AND centroid_lat BETWEEN ? AND ?
             ORDER BY id",
            self.table
        ))?;
        let mut rows = stmt.query(duckdb::params![min_lon, max_lon, min_lat, max_lat])?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn upsert(&self, record: &Record) -> Result<(), LoadError> {
        let document = serde_json::to_string(record)?;
        let centroid = record.place.centroid.coordinates;

        self.conn()?.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (id, timestamp_ms, place_id, centroid_lon, centroid_lat, centroid_hash, document)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                self.table
            ),
            duckdb::params![
                record.id,
                record.timestamp,
                record.place.id,
                centroid.lon,
                centroid.lat,
                record.place.centroid_hash,
                document,
            ],
        )?;
        Ok(())
    }
}

fn create_schema(conn: &Connection, table: &str) -> Result<(), LoadError> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            timestamp_ms BIGINT NOT NULL,
            place_id TEXT NOT NULL,
            centroid_lon DOUBLE NOT NULL,
            centroid_lat DOUBLE NOT NULL,
            centroid_hash TEXT NOT NULL,
            document TEXT NOT NULL
        );"
    ))?;
    Ok(())
}

#[async_trait::async_trait]
impl PersistenceAdapter for DocumentStore {
    fn backend(&self) -> BackendKind {
        BackendKind::DocumentStore
    }

    async fn insert_one(&mut self, record: &Record) -> Result<(), LoadError> {
        self.upsert(record)
    }

    async fn insert_many(&mut self, records: &[Record]) -> Vec<LoadFailure> {
        records
            .iter()
            .filter_map(|record| {
                self.upsert(record)
                    .err()
                    .map(|e| crate::failure(record, &e))
            })
            .collect()
    }

    async fn close(&mut self) -> Result<(), LoadError> {
        let conn = self.conn.take().ok_or(LoadError::Closed)?;
        conn.close().map_err(|(_, e)| LoadError::DocumentStore(e))?;
        log::info!("Closed document store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_records::city;

    #[tokio::test]
    async fn stores_and_reads_back_documents() {
        let mut store = DocumentStore::open(IN_MEMORY, "records").unwrap();
        let record = city("1", "hello springfield");

        store.insert_one(&record).await.unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let stored = store.get("1").unwrap().unwrap();
        assert_eq!(stored.id, record.id);
        assert_eq!(stored.timestamp, record.timestamp);
        assert_eq!(stored.place.full_name, "Springfield, IL");
        assert_eq!(store.get("2").unwrap(), None);
    }

    #[tokio::test]
    async fn reloading_an_id_replaces_it() {
        let mut store = DocumentStore::open(IN_MEMORY, "records").unwrap();

        let failures = store
            .insert_many(&[city("1", "first"), city("2", "second")])
            .await;
        assert!(failures.is_empty());

        store.insert_one(&city("1", "edited")).await.unwrap();

        assert_eq!(store.count().unwrap(), 2);
        let stored = store.get("1").unwrap().unwrap();
        assert_eq!(stored.text(), Some("edited"));
    }

    #[tokio::test]
    async fn filters_by_centroid() {
        let mut store = DocumentStore::open(IN_MEMORY, "records").unwrap();
        store.insert_one(&city("1", "x")).await.unwrap();

        assert_eq!(
            store.ids_within(-90.0, 39.0, -89.0, 40.0).unwrap(),
            vec!["1".to_string()]
        );
        assert!(store.ids_within(0.0, 0.0, 1.0, 1.0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_store_rejects_writes() {
        let mut store = DocumentStore::open(IN_MEMORY, "records").unwrap();
        store.close().await.unwrap();

        assert!(matches!(
            store.insert_one(&city("1", "x")).await,
            Err(LoadError::Closed)
        ));
        let failures = store.insert_many(&[city("1", "x")]).await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, "1");
        assert!(matches!(store.close().await, Err(LoadError::Closed)));
    }

    #[test]
    fn rejects_unsafe_table_names() {
        assert!(matches!(
            DocumentStore::open(IN_MEMORY, "records; DROP TABLE x"),
            Err(LoadError::Config { .. })
        ));
        assert!(matches!(
            DocumentStore::open(IN_MEMORY, ""),
            Err(LoadError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn persists_to_file() {
        let dir = std::env::temp_dir().join("geotweet_document_store_file");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("records.duckdb");
        let path = path.to_str().unwrap();

        let mut store = DocumentStore::open(path, "records").unwrap();
        store.insert_one(&city("1", "x")).await.unwrap();
        store.close().await.unwrap();

        let reopened = DocumentStore::open(path, "records").unwrap();
        assert_eq!(reopened.count().unwrap(), 1);

        drop(reopened);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
