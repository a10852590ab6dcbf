//! Search-index client interface and its backends
//!
//! `IndexClient` is the only seam between the pipeline and a search service.
//! Backends:
//! - [`RediSearchClient`]: a remote RediSearch module over multiplexed
//!   redis connections
//! - [`TantivyIndexClient`]: an embedded tantivy index on disk or in RAM
//! - [`MockIndexClient`]: in-memory recorder used by tests and dry runs

mod mock;
mod redisearch;
mod tantivy_index;

pub use self::mock::{MockIndexClient, MockSnapshot};
pub use self::redisearch::RediSearchClient;
pub use self::tantivy_index::{IndexLocation, TantivyIndexClient};

use crate::document::{Document, FieldValue};
use crate::errors::ClientError;
use crate::schema::IndexSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-call indexing options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingOptions {
    /// Index the fields without retaining their values
    pub no_save: bool,
    /// Overwrite a document that already has the same id
    pub replace: bool,
}

/// A search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub offset: usize,
    pub limit: usize,
    /// Return ids only
    pub no_content: bool,
    /// Do not stem query terms
    pub verbatim: bool,
}

impl SearchQuery {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            offset: 0,
            limit: 10,
            no_content: false,
            verbatim: false,
        }
    }

    #[must_use]
    pub fn limit(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn no_content(mut self) -> Self {
        self.no_content = true;
        self
    }

    #[must_use]
    pub fn verbatim(mut self) -> Self {
        self.verbatim = true;
        self
    }
}

/// One search result; `fields` is empty for id-only searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub fields: Vec<(String, FieldValue)>,
}

/// Index statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub num_docs: u64,
    pub fields: Vec<String>,
}

/// A search-index service
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Name of the index this client operates on
    fn index_name(&self) -> &str;

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), ClientError>;

    async fn drop_index(&self) -> Result<(), ClientError>;

    /// Submit one batch
    async fn index_documents(
        &self,
        options: &IndexingOptions,
        docs: &[Document],
    ) -> Result<(), ClientError>;

    /// Run a query, returning the requested page of hits and the total count
    async fn search(&self, query: &SearchQuery) -> Result<(Vec<SearchHit>, usize), ClientError>;

    async fn info(&self) -> Result<IndexInfo, ClientError>;
}
