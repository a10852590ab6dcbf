//! Embedded tantivy backend
//!
//! Maps an `IndexSchema` onto a tantivy schema, commits once per batch and
//! reloads the reader manually after each commit. On disk the index lives in
//! `<base_dir>/<index name>` with the source schema stored next to it so a
//! later process (the query benchmark) can reopen it.

use super::{IndexClient, IndexInfo, IndexingOptions, SearchHit, SearchQuery};
use crate::document::{Document, FieldValue};
use crate::errors::ClientError;
use crate::schema::{FieldKind, IndexSchema};
use crate::utils::TANTIVY_WRITER_MEMORY;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{
    Field, IndexRecordOption, NumericOptions, STORED, STRING, Schema, TextFieldIndexing,
    TextOptions, Value,
};
use tantivy::{Index, IndexReader, IndexSettings, IndexWriter, ReloadPolicy, TantivyDocument, Term};

const ID_FIELD: &str = "__id";
const SCHEMA_FILE: &str = "searchbench_schema.json";

const STEMMING_TOKENIZER: &str = "en_stem";
const PLAIN_TOKENIZER: &str = "default";
const TAG_TOKENIZER: &str = "raw";

/// Where the index is kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexLocation {
    /// `<dir>/<index name>`
    Directory(PathBuf),
    InMemory,
}

struct MappedField {
    name: String,
    field: Field,
    kind: FieldKind,
}

struct OpenIndex {
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    id_field: Field,
    fields: Vec<MappedField>,
    query_parser: QueryParser,
}

pub struct TantivyIndexClient {
    name: String,
    location: IndexLocation,
    memory_limit: usize,
    open: RwLock<Option<Arc<OpenIndex>>>,
}

fn record_option(schema: &IndexSchema) -> IndexRecordOption {
    if schema.options.no_frequencies {
        IndexRecordOption::Basic
    } else if schema.options.no_offset_vectors {
        IndexRecordOption::WithFreqs
    } else {
        IndexRecordOption::WithFreqsAndPositions
    }
}

/// Translate the backend-neutral schema into a tantivy schema
fn build_schema(schema: &IndexSchema) -> (Schema, Field, Vec<MappedField>) {
    let mut builder = Schema::builder();
    let id_field = builder.add_text_field(ID_FIELD, STRING | STORED);
    let store = !schema.options.no_save;

    let mut fields = Vec::with_capacity(schema.fields.len());
    for spec in &schema.fields {
        let field = match spec.kind {
            FieldKind::Text {
                sortable,
                no_stem,
                no_index,
            } => {
                let mut options = TextOptions::default();
                if !no_index {
                    let tokenizer = if no_stem {
                        PLAIN_TOKENIZER
                    } else {
                        STEMMING_TOKENIZER
                    };
                    options = options.set_indexing_options(
                        TextFieldIndexing::default()
                            .set_tokenizer(tokenizer)
                            .set_index_option(record_option(schema)),
                    );
                }
                // A field nobody can search still has to be retrievable
                if store || no_index {
                    options = options.set_stored();
                }
                if sortable {
                    options = options.set_fast(None);
                }
                builder.add_text_field(&spec.name, options)
            }
            FieldKind::Tag => {
                let mut options = TextOptions::default().set_indexing_options(
                    TextFieldIndexing::default()
                        .set_tokenizer(TAG_TOKENIZER)
                        .set_index_option(IndexRecordOption::Basic),
                );
                if store {
                    options = options.set_stored();
                }
                builder.add_text_field(&spec.name, options)
            }
            FieldKind::Numeric { sortable, no_index } => {
                let mut options = NumericOptions::default();
                if !no_index {
                    options = options.set_indexed();
                }
                if sortable {
                    options = options.set_fast();
                }
                if store || no_index {
                    options = options.set_stored();
                }
                builder.add_f64_field(&spec.name, options)
            }
        };
        fields.push(MappedField {
            name: spec.name.clone(),
            field,
            kind: spec.kind,
        });
    }

    (builder.build(), id_field, fields)
}

fn to_tantivy(doc: &Document, id_field: Field, fields: &[MappedField]) -> TantivyDocument {
    let mut out = TantivyDocument::default();
    out.add_text(id_field, &doc.id);

    for mapped in fields {
        let Some(value) = doc.get(&mapped.name) else {
            continue;
        };
        match (mapped.kind, value) {
            (FieldKind::Tag, value) => {
                let joined = value.to_string();
                for tag in joined.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                    out.add_text(mapped.field, tag);
                }
            }
            (FieldKind::Text { .. }, value) => out.add_text(mapped.field, value.to_string()),
            (FieldKind::Numeric { .. }, FieldValue::Integer(i)) => {
                out.add_f64(mapped.field, *i as f64);
            }
            (FieldKind::Numeric { .. }, FieldValue::Float(f)) => out.add_f64(mapped.field, *f),
            (FieldKind::Numeric { .. }, FieldValue::Text(s)) => {
                if let Ok(n) = s.trim().parse::<f64>() {
                    out.add_f64(mapped.field, n);
                }
            }
        }
    }
    out
}

impl OpenIndex {
    fn new(
        index: Index,
        schema: &IndexSchema,
        memory_limit: usize,
    ) -> Result<Self, ClientError> {
        let (_, id_field, fields) = build_schema(schema);
        let writer: IndexWriter = index.writer(memory_limit)?;
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        let searchable: Vec<Field> = schema
            .searchable_text_fields()
            .filter_map(|name| fields.iter().find(|f| f.name == name).map(|f| f.field))
            .collect();
        let query_parser = QueryParser::for_index(&index, searchable);

        Ok(Self {
            writer: Mutex::new(writer),
            reader,
            id_field,
            fields,
            query_parser,
        })
    }

    fn hit(&self, doc: &TantivyDocument, no_content: bool) -> SearchHit {
        let id = doc
            .get_first(self.id_field)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let mut fields = Vec::new();
        if !no_content {
            for mapped in &self.fields {
                if let FieldKind::Numeric { .. } = mapped.kind {
                    if let Some(n) = doc.get_first(mapped.field).and_then(|v| v.as_f64()) {
                        fields.push((mapped.name.clone(), FieldValue::Float(n)));
                    }
                    continue;
                }
                let values: Vec<String> = doc
                    .get_all(mapped.field)
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                if !values.is_empty() {
                    fields.push((mapped.name.clone(), FieldValue::Text(values.join(","))));
                }
            }
        }
        SearchHit { id, fields }
    }
}

impl TantivyIndexClient {
    #[must_use]
    pub fn new(name: impl Into<String>, location: IndexLocation) -> Self {
        Self {
            name: name.into(),
            location,
            memory_limit: TANTIVY_WRITER_MEMORY,
            open: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    fn index_dir(&self) -> Option<PathBuf> {
        match &self.location {
            IndexLocation::Directory(base) => Some(base.join(&self.name)),
            IndexLocation::InMemory => None,
        }
    }

    /// The open index, reopening an on-disk index left by an earlier run
    fn current(&self) -> Result<Arc<OpenIndex>, ClientError> {
        if let Some(open) = self.open.read().as_ref() {
            return Ok(Arc::clone(open));
        }

        let mut slot = self.open.write();
        if let Some(open) = slot.as_ref() {
            return Ok(Arc::clone(open));
        }

        let Some(dir) = self.index_dir().filter(|d| d.join(SCHEMA_FILE).exists()) else {
            return Err(ClientError::UnknownIndex(self.name.clone()));
        };
        let raw = std::fs::read(dir.join(SCHEMA_FILE))?;
        let schema: IndexSchema = serde_json::from_slice(&raw)
            .map_err(|e| ClientError::Other(format!("Corrupt schema file in {dir:?}: {e}")))?;
        let index = Index::open_in_dir(&dir)?;

        tracing::debug!(index = %self.name, dir = %dir.display(), "Reopened tantivy index");
        let open = Arc::new(OpenIndex::new(index, &schema, self.memory_limit)?);
        *slot = Some(Arc::clone(&open));
        Ok(open)
    }
}

#[async_trait]
impl IndexClient for TantivyIndexClient {
    fn index_name(&self) -> &str {
        &self.name
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), ClientError> {
        let create_error = |reason: String| ClientError::CreateIndex {
            index: self.name.clone(),
            reason,
        };

        let mut slot = self.open.write();
        if slot.is_some() {
            return Err(create_error("Index already exists".to_string()));
        }

        let (tantivy_schema, _, _) = build_schema(schema);
        let index = match self.index_dir() {
            Some(dir) => {
                if dir.join(SCHEMA_FILE).exists() {
                    return Err(create_error(format!("Index already exists in {dir:?}")));
                }
                std::fs::create_dir_all(&dir)?;
                let json = serde_json::to_vec_pretty(schema)
                    .map_err(|e| create_error(e.to_string()))?;
                std::fs::write(dir.join(SCHEMA_FILE), json)?;
                let directory = MmapDirectory::open(&dir)
                    .map_err(|e| create_error(e.to_string()))?;
                Index::create(directory, tantivy_schema, IndexSettings::default())?
            }
            None => Index::create_in_ram(tantivy_schema),
        };

        *slot = Some(Arc::new(OpenIndex::new(index, schema, self.memory_limit)?));
        tracing::info!(index = %self.name, fields = schema.fields.len(), "Created tantivy index");
        Ok(())
    }

    async fn drop_index(&self) -> Result<(), ClientError> {
        let mut slot = self.open.write();
        let was_open = slot.take().is_some();

        let removed = match self.index_dir() {
            Some(dir) if dir.exists() => {
                std::fs::remove_dir_all(&dir)?;
                true
            }
            _ => false,
        };

        if was_open || removed {
            Ok(())
        } else {
            Err(ClientError::UnknownIndex(self.name.clone()))
        }
    }

    async fn index_documents(
        &self,
        options: &IndexingOptions,
        docs: &[Document],
    ) -> Result<(), ClientError> {
        let open = self.current()?;
        let batch: Vec<(String, TantivyDocument)> = docs
            .iter()
            .filter(|d| d.has_id())
            .map(|d| (d.id.clone(), to_tantivy(d, open.id_field, &open.fields)))
            .collect();
        let replace = options.replace;

        tokio::task::spawn_blocking(move || -> Result<(), ClientError> {
            let mut writer = open.writer.lock();
            for (id, doc) in batch {
                if replace {
                    writer.delete_term(Term::from_field_text(open.id_field, &id));
                }
                writer.add_document(doc)?;
            }
            writer.commit()?;
            drop(writer);
            open.reader.reload()?;
            Ok(())
        })
        .await
        .map_err(|e| ClientError::Other(format!("Indexing task panicked: {e}")))?
    }

    async fn search(&self, query: &SearchQuery) -> Result<(Vec<SearchHit>, usize), ClientError> {
        let open = self.current()?;
        let query = query.clone();

        tokio::task::spawn_blocking(move || -> Result<(Vec<SearchHit>, usize), ClientError> {
            let parsed = open
                .query_parser
                .parse_query(&query.text)
                .map_err(|e| ClientError::QueryParsing {
                    query: query.text.clone(),
                    reason: e.to_string(),
                })?;
            let searcher = open.reader.searcher();

            if query.limit == 0 {
                let total = searcher.search(&*parsed, &Count)?;
                return Ok((Vec::new(), total));
            }

            let (top, total) = searcher.search(
                &*parsed,
                &(
                    TopDocs::with_limit(query.limit).and_offset(query.offset),
                    Count,
                ),
            )?;

            let mut hits = Vec::with_capacity(top.len());
            for (_score, address) in top {
                let doc: TantivyDocument = searcher.doc(address)?;
                hits.push(open.hit(&doc, query.no_content));
            }
            Ok((hits, total))
        })
        .await
        .map_err(|e| ClientError::Other(format!("Search task panicked: {e}")))?
    }

    async fn info(&self) -> Result<IndexInfo, ClientError> {
        let open = self.current()?;
        let searcher = open.reader.searcher();
        Ok(IndexInfo {
            name: self.name.clone(),
            num_docs: searcher.num_docs(),
            fields: open.fields.iter().map(|f| f.name.clone()).collect(),
        })
    }
}
