//! Full-text search index backed by Tantivy.
//!
//! Indexes post text and place names for search, keeps the place tags and
//! centroid as exact-match and numeric fields, and stores the whole cleaned
//! document so hits can be returned without a second store.

use std::path::Path;

use geotweet_load_models::{BackendKind, LoadFailure};
use geotweet_record_models::Record;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{
    Field, IndexRecordOption, NumericOptions, STORED, STRING, Schema, TextFieldIndexing,
    TextOptions, Value,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term, doc};

use crate::{LoadError, PersistenceAdapter};

/// Names of all fields in the record schema.
pub struct FieldNames;

impl FieldNames {
    /// Record id, exact match. Used as the upsert key.
    pub const ID: &'static str = "id";
    /// Milliseconds since the epoch.
    pub const TIMESTAMP_MS: &'static str = "timestamp_ms";
    /// Post text.
    pub const TEXT: &'static str = "text";
    /// Place short name (e.g. "Springfield").
    pub const PLACE_NAME: &'static str = "place_name";
    /// Place full name (e.g. "Springfield, IL").
    pub const PLACE_FULL_NAME: &'static str = "place_full_name";
    /// Place type tag, exact match.
    pub const PLACE_TYPE: &'static str = "place_type";
    /// Two-letter country code, exact match.
    pub const COUNTRY_CODE: &'static str = "country_code";
    pub const CENTROID_LAT: &'static str = "centroid_lat";
    pub const CENTROID_LON: &'static str = "centroid_lon";
    /// Centroid geohash, exact match.
    pub const CENTROID_HASH: &'static str = "centroid_hash";
    /// Full cleaned record as JSON (stored only).
    pub const DOCUMENT: &'static str = "document";
}

/// Resolved field handles.
#[derive(Debug, Clone)]
pub struct RecordFields {
    pub id: Field,
    pub timestamp_ms: Field,
    pub text: Field,
    pub place_name: Field,
    pub place_full_name: Field,
    pub place_type: Field,
    pub country_code: Field,
    pub centroid_lat: Field,
    pub centroid_lon: Field,
    pub centroid_hash: Field,
    pub document: Field,
}

impl RecordFields {
    /// Resolves field handles from a schema.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::SearchIndex`] if the schema was not built by
    /// [`build_schema`] (e.g. an index directory from another tool).
    pub fn from_schema(schema: &Schema) -> Result<Self, LoadError> {
        Ok(Self {
            id: schema.get_field(FieldNames::ID)?,
            timestamp_ms: schema.get_field(FieldNames::TIMESTAMP_MS)?,
            text: schema.get_field(FieldNames::TEXT)?,
            place_name: schema.get_field(FieldNames::PLACE_NAME)?,
            place_full_name: schema.get_field(FieldNames::PLACE_FULL_NAME)?,
            place_type: schema.get_field(FieldNames::PLACE_TYPE)?,
            country_code: schema.get_field(FieldNames::COUNTRY_CODE)?,
            centroid_lat: schema.get_field(FieldNames::CENTROID_LAT)?,
            centroid_lon: schema.get_field(FieldNames::CENTROID_LON)?,
            centroid_hash: schema.get_field(FieldNames::CENTROID_HASH)?,
            document: schema.get_field(FieldNames::DOCUMENT)?,
        })
    }
}

/// Builds the Tantivy schema for cleaned records.
#[must_use]
pub fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    let text_stored = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("default")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();

    builder.add_text_field(FieldNames::ID, STRING | STORED);
    builder.add_i64_field(
        FieldNames::TIMESTAMP_MS,
        NumericOptions::default()
            .set_stored()
            .set_indexed()
            .set_fast(),
    );

    builder.add_text_field(FieldNames::TEXT, text_stored.clone());
    builder.add_text_field(FieldNames::PLACE_NAME, text_stored.clone());
    builder.add_text_field(FieldNames::PLACE_FULL_NAME, text_stored);

    builder.add_text_field(FieldNames::PLACE_TYPE, STRING | STORED);
    builder.add_text_field(FieldNames::COUNTRY_CODE, STRING | STORED);
    builder.add_text_field(FieldNames::CENTROID_HASH, STRING | STORED);

    let f64_options = NumericOptions::default().set_stored().set_fast();
    builder.add_f64_field(FieldNames::CENTROID_LAT, f64_options.clone());
    builder.add_f64_field(FieldNames::CENTROID_LON, f64_options);

    builder.add_text_field(FieldNames::DOCUMENT, STORED);

    builder.build()
}

/// A Tantivy index of cleaned records.
pub struct SearchIndexStore {
    index: Index,
    fields: RecordFields,
    writer: Option<IndexWriter>,
    reader: IndexReader,
}

impl SearchIndexStore {
    /// Opens the index in `dir`, creating the directory and index if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the directory cannot be created or holds an
    /// index with a different schema.
    pub fn open(dir: &Path, writer_heap_bytes: usize) -> Result<Self, LoadError> {
        std::fs::create_dir_all(dir)?;
        let directory = MmapDirectory::open(dir).map_err(tantivy::TantivyError::from)?;
        let index = Index::open_or_create(directory, build_schema())?;

        log::info!("Opened search index at {}", dir.display());
        Self::from_index(index, writer_heap_bytes)
    }

    /// Creates a RAM-only index.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the writer cannot be created.
    pub fn in_memory(writer_heap_bytes: usize) -> Result<Self, LoadError> {
        Self::from_index(Index::create_in_ram(build_schema()), writer_heap_bytes)
    }

    fn from_index(index: Index, writer_heap_bytes: usize) -> Result<Self, LoadError> {
        let fields = RecordFields::from_schema(&index.schema())?;
        let writer = index.writer_with_num_threads(1, writer_heap_bytes)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            fields,
            writer: Some(writer),
            reader,
        })
    }

    /// Number of live documents as of the last commit.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the reader cannot be reloaded.
    pub fn num_docs(&self) -> Result<u64, LoadError> {
        self.reader.reload()?;
        Ok(self.reader.searcher().num_docs())
    }

    /// Searches post text and place names, returning the ids of the best
    /// `limit` matches.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the query does not parse or the search
    /// fails.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, LoadError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.reader.reload()?;
        let searcher = self.reader.searcher();

        let parser = QueryParser::for_index(
            &self.index,
            vec![
                self.fields.text,
                self.fields.place_name,
                self.fields.place_full_name,
            ],
        );
        let query = parser
            .parse_query(query)
            .map_err(|e| LoadError::SearchIndex(e.into()))?;

        let mut ids = Vec::new();
        for (_score, address) in searcher.search(&query, &TopDocs::with_limit(limit))? {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(id) = doc.get_first(self.fields.id).and_then(|v| v.as_str()) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Returns the stored record for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the lookup fails or the stored JSON does
    /// not parse.
    pub fn get(&self, id: &str) -> Result<Option<Record>, LoadError> {
        self.reader.reload()?;
        let searcher = self.reader.searcher();

        let query = tantivy::query::TermQuery::new(
            Term::from_field_text(self.fields.id, id),
            IndexRecordOption::Basic,
        );
        let Some((_score, address)) = searcher
            .search(&query, &TopDocs::with_limit(1))?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };

        let doc: TantivyDocument = searcher.doc(address)?;
        let Some(document) = doc.get_first(self.fields.document).and_then(|v| v.as_str()) else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(document)?))
    }

    /// Builds the index document for `record` without touching the writer.
    fn to_document(&self, record: &Record) -> Result<TantivyDocument, LoadError> {
        let fields = &self.fields;
        let place = &record.place;
        let centroid = place.centroid.coordinates;

        Ok(doc!(
            fields.id => record.id.as_str(),
            fields.timestamp_ms => record.timestamp,
            fields.text => record.text().unwrap_or(""),
            fields.place_name => place.name.as_str(),
            fields.place_full_name => place.full_name.as_str(),
            fields.place_type => place.place_type.as_str(),
            fields.country_code => place.country_code.as_str(),
            fields.centroid_lat => centroid.lat,
            fields.centroid_lon => centroid.lon,
            fields.centroid_hash => place.centroid_hash.as_str(),
            fields.document => serde_json::to_string(record)?,
        ))
    }

    /// Replaces any document with the record's id by the record.
    ///
    /// The delete is queued only once the new document is built, so a record
    /// that cannot be indexed leaves the previous version in place.
    fn stage(&self, record: &Record) -> Result<(), LoadError> {
        let writer = self.writer.as_ref().ok_or(LoadError::Closed)?;
        let document = self.to_document(record)?;

        writer.delete_term(Term::from_field_text(self.fields.id, &record.id));
        writer.add_document(document)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), LoadError> {
        self.writer.as_mut().ok_or(LoadError::Closed)?.commit()?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PersistenceAdapter for SearchIndexStore {
    fn backend(&self) -> BackendKind {
        BackendKind::SearchIndex
    }

    async fn insert_one(&mut self, record: &Record) -> Result<(), LoadError> {
        self.stage(record)?;
        self.commit()
    }

    async fn insert_many(&mut self, records: &[Record]) -> Vec<LoadFailure> {
        let mut failures = Vec::new();
        let mut staged = Vec::with_capacity(records.len());

        for record in records {
            match self.stage(record) {
                Ok(()) => staged.push(record),
                Err(e) => failures.push(crate::failure(record, &e)),
            }
        }

        if !staged.is_empty() {
            if let Err(e) = self.commit() {
                failures.extend(staged.into_iter().map(|record| crate::failure(record, &e)));
            }
        }

        failures
    }

    async fn close(&mut self) -> Result<(), LoadError> {
        let mut writer = self.writer.take().ok_or(LoadError::Closed)?;
        writer.commit()?;
        writer.wait_merging_threads()?;
        log::info!("Closed search index");
        Ok(())
    }
}
