//! In-memory index client that records every call

use super::{IndexClient, IndexInfo, IndexingOptions, SearchHit, SearchQuery};
use crate::document::Document;
use crate::errors::ClientError;
use crate::schema::IndexSchema;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Everything the mock has been asked to do
#[derive(Debug, Clone, Default)]
pub struct MockSnapshot {
    pub schema: Option<IndexSchema>,
    /// Accepted batches in submission order
    pub batches: Vec<Vec<Document>>,
    pub options: Vec<IndexingOptions>,
    pub failed_batches: usize,
    pub creates: usize,
    pub drops: usize,
    pub searches: usize,
}

impl MockSnapshot {
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.batches
            .iter()
            .flatten()
            .map(|d| d.id.clone())
            .collect()
    }
}

/// Test double for [`IndexClient`] with configurable latency and failures
pub struct MockIndexClient {
    name: String,
    latency: Duration,
    failing_batches: HashSet<u64>,
    fail_create: bool,
    fail_search: bool,
    submissions: AtomicU64,
    state: Mutex<MockSnapshot>,
}

impl MockIndexClient {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latency: Duration::ZERO,
            failing_batches: HashSet::new(),
            fail_create: false,
            fail_search: false,
            submissions: AtomicU64::new(0),
            state: Mutex::new(MockSnapshot::default()),
        }
    }

    /// Delay every indexing and search call
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the given submissions (0-based, in arrival order)
    #[must_use]
    pub fn failing_batches(mut self, batches: impl IntoIterator<Item = u64>) -> Self {
        self.failing_batches.extend(batches);
        self
    }

    #[must_use]
    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    #[must_use]
    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    #[must_use]
    pub fn snapshot(&self) -> MockSnapshot {
        self.state.lock().clone()
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl IndexClient for MockIndexClient {
    fn index_name(&self) -> &str {
        &self.name
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), ClientError> {
        if self.fail_create {
            return Err(ClientError::CreateIndex {
                index: self.name.clone(),
                reason: "injected failure".to_string(),
            });
        }

        let mut state = self.state.lock();
        if state.schema.is_some() {
            return Err(ClientError::CreateIndex {
                index: self.name.clone(),
                reason: "Index already exists".to_string(),
            });
        }
        state.schema = Some(schema.clone());
        state.creates += 1;
        Ok(())
    }

    async fn drop_index(&self) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        if state.schema.take().is_none() {
            return Err(ClientError::UnknownIndex(self.name.clone()));
        }
        state.batches.clear();
        state.options.clear();
        state.drops += 1;
        Ok(())
    }

    async fn index_documents(
        &self,
        options: &IndexingOptions,
        docs: &[Document],
    ) -> Result<(), ClientError> {
        let n = self.submissions.fetch_add(1, Ordering::AcqRel);
        self.delay().await;

        let mut state = self.state.lock();
        if self.failing_batches.contains(&n) {
            state.failed_batches += 1;
            return Err(ClientError::Indexing {
                count: docs.len(),
                reason: format!("injected failure for batch {n}"),
            });
        }
        state.batches.push(docs.to_vec());
        state.options.push(*options);
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<(Vec<SearchHit>, usize), ClientError> {
        self.delay().await;

        let mut state = self.state.lock();
        state.searches += 1;
        if self.fail_search {
            return Err(ClientError::Search("injected failure".to_string()));
        }

        let needle = query.text.to_lowercase();
        let matches: Vec<&Document> = state
            .batches
            .iter()
            .flatten()
            .filter(|doc| {
                doc.fields().any(|(_, v)| {
                    v.as_str()
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
                })
            })
            .collect();

        let total = matches.len();
        let hits = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|doc| SearchHit {
                id: doc.id.clone(),
                fields: if query.no_content {
                    Vec::new()
                } else {
                    doc.fields()
                        .map(|(n, v)| (n.to_string(), v.clone()))
                        .collect()
                },
            })
            .collect();

        Ok((hits, total))
    }

    async fn info(&self) -> Result<IndexInfo, ClientError> {
        let state = self.state.lock();
        let Some(schema) = state.schema.as_ref() else {
            return Err(ClientError::UnknownIndex(self.name.clone()));
        };
        Ok(IndexInfo {
            name: self.name.clone(),
            num_docs: state.batches.iter().map(Vec::len).sum::<usize>() as u64,
            fields: schema.fields.iter().map(|f| f.name.clone()).collect(),
        })
    }
}
