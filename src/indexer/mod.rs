//! Batch indexer: concurrent consumers that chunk documents and submit them
//! to an [`IndexClient`]
//!
//! Workers share one receiver and one [`PipelineStats`]. A failed batch is
//! logged and counted as lost; it is never retried.

mod metrics;
mod stats;

pub use metrics::{
    CSV_HEADER, CsvMetricsSink, JsonLinesMetricsSink, MemoryMetricsSink, MetricsSink, csv_line,
};
pub use stats::{Admission, MetricsRow, PipelineStats};

use crate::client::{IndexClient, IndexingOptions};
use crate::document::Document;
use crate::errors::{IngestError, IngestResult};
use crate::schema::{IndexSchema, SchemaProvider};
use crate::utils::{
    DEFAULT_CHUNK_SIZE, DEFAULT_INDEXER_CONCURRENCY, DEFAULT_REPORT_EVERY,
    DEFAULT_REPORT_INTERVAL_SECS,
};
use async_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;

/// Tuning for a [`BatchIndexer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerSettings {
    pub concurrency: usize,
    pub chunk_size: usize,
    /// Stop after this many observed documents
    pub limit: Option<u64>,
    pub options: IndexingOptions,
    pub report_every: u64,
    pub min_report_interval: Duration,
    pub skip_index_recreation: bool,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_INDEXER_CONCURRENCY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            limit: None,
            options: IndexingOptions {
                no_save: true,
                replace: false,
            },
            report_every: DEFAULT_REPORT_EVERY,
            min_report_interval: Duration::from_secs(DEFAULT_REPORT_INTERVAL_SECS),
            skip_index_recreation: false,
        }
    }
}

/// Outcome of [`BatchIndexer::run`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub documents_submitted: u64,
    pub batches_submitted: u64,
    pub failed_batches: u64,
    pub lost_documents: u64,
    pub skipped_documents: u64,
    pub limit_reached: bool,
    pub elapsed: Duration,
    pub average_batch_latency: Duration,
}

impl IndexSummary {
    #[must_use]
    pub fn docs_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.documents_submitted as f64 / secs
        } else {
            0.0
        }
    }
}

struct Shared {
    client: Arc<dyn IndexClient>,
    settings: IndexerSettings,
    sink: Arc<dyn MetricsSink>,
    stats: Arc<PipelineStats>,
    limit_reached: AtomicBool,
}

pub struct BatchIndexer {
    schema: IndexSchema,
    shared: Arc<Shared>,
}

impl BatchIndexer {
    /// `schema` is asked once for the layout `prepare()` creates
    #[must_use]
    pub fn new(
        client: Arc<dyn IndexClient>,
        schema: &dyn SchemaProvider,
        settings: IndexerSettings,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            schema: schema.schema(),
            shared: Arc::new(Shared {
                client,
                settings,
                sink,
                stats: Arc::new(PipelineStats::new()),
                limit_reached: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.shared.stats)
    }

    #[must_use]
    pub fn settings(&self) -> &IndexerSettings {
        &self.shared.settings
    }

    /// Drop and recreate the index unless recreation is disabled
    ///
    /// # Errors
    ///
    /// Returns the client error if the index cannot be created. A failed
    /// drop is ignored, the index may simply not exist yet.
    pub async fn prepare(&self) -> IngestResult<()> {
        let client = &self.shared.client;
        if self.shared.settings.skip_index_recreation {
            tracing::info!(index = client.index_name(), "Keeping existing index");
            return Ok(());
        }

        if let Err(e) = client.drop_index().await {
            tracing::debug!(index = client.index_name(), error = %e, "Drop before create failed");
        }
        client.create_index(&self.schema).await?;
        tracing::info!(
            index = client.index_name(),
            fields = self.schema.fields.len(),
            "Index created"
        );
        Ok(())
    }

    /// Consume `rx` until it closes (or the limit is hit) and submit
    /// everything received
    ///
    /// # Errors
    ///
    /// Returns `TaskFailed` if a worker panicked.
    pub async fn run(&self, rx: Receiver<Document>) -> IngestResult<IndexSummary> {
        let concurrency = self.shared.settings.concurrency.max(1);
        tracing::info!(
            workers = concurrency,
            chunk_size = self.shared.settings.chunk_size,
            limit = ?self.shared.settings.limit,
            "Starting indexer"
        );

        let mut workers = JoinSet::new();
        for id in 0..concurrency {
            workers.spawn(worker(Arc::clone(&self.shared), rx.clone(), id));
        }
        drop(rx);

        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Indexer worker failed");
                failure.get_or_insert_with(|| IngestError::TaskFailed(format!("indexer worker: {e}")));
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }

        let stats = &self.shared.stats;
        let summary = IndexSummary {
            documents_submitted: stats.documents_submitted(),
            batches_submitted: stats.batches_submitted(),
            failed_batches: stats.failed_batches(),
            lost_documents: stats.lost_documents(),
            skipped_documents: stats.skipped_documents(),
            limit_reached: self.shared.limit_reached.load(Ordering::Acquire),
            elapsed: stats.elapsed(),
            average_batch_latency: stats.average_latency(),
        };

        tracing::info!(
            documents = summary.documents_submitted,
            batches = summary.batches_submitted,
            failed_batches = summary.failed_batches,
            lost = summary.lost_documents,
            skipped = summary.skipped_documents,
            docs_per_sec = summary.docs_per_sec(),
            duration_ms = summary.elapsed.as_millis() as u64,
            "Indexing finished"
        );
        Ok(summary)
    }
}

async fn worker(shared: Arc<Shared>, rx: Receiver<Document>, id: usize) {
    let chunk_size = shared.settings.chunk_size.max(1);
    let mut batch = Vec::with_capacity(chunk_size);

    while let Ok(doc) = rx.recv().await {
        let admission = shared.stats.admit(shared.settings.limit);
        if admission == Admission::Rejected {
            shared.stop_intake(&rx);
            break;
        }

        if doc.has_id() {
            batch.push(doc);
        } else {
            shared.stats.record_skipped();
        }

        if batch.len() >= chunk_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(chunk_size));
            shared.submit(full).await;
        }

        if admission == Admission::Last {
            shared.stop_intake(&rx);
            break;
        }
    }

    if !batch.is_empty() {
        shared.submit(batch).await;
    }
    tracing::trace!(worker = id, "Indexer worker done");
}

impl Shared {
    /// Close the channel from the consumer side so producers stop
    fn stop_intake(&self, rx: &Receiver<Document>) {
        if !self.limit_reached.swap(true, Ordering::AcqRel) {
            tracing::info!(limit = ?self.settings.limit, "Document limit reached");
        }
        rx.close();
    }

    async fn submit(&self, batch: Vec<Document>) {
        let count = batch.len();
        let bytes: u64 = batch.iter().map(|d| d.estimate_size() as u64).sum();
        let started = std::time::Instant::now();

        match self.client.index_documents(&self.settings.options, &batch).await {
            Ok(()) => {
                let (before, after) = self.stats.record_batch(count, bytes, started.elapsed());
                if let Some(row) = self.stats.maybe_sample(
                    before,
                    after,
                    self.settings.report_every,
                    self.settings.min_report_interval,
                ) {
                    tracing::info!(
                        documents = row.documents,
                        docs_per_sec = row.docs_per_sec,
                        latency_ms = row.avg_latency_ms,
                        mb_per_sec = row.mb_per_sec,
                        "Indexing progress"
                    );
                    if let Err(e) = self.sink.write_row(&row) {
                        tracing::warn!(error = %e, "Failed to write metrics row");
                    }
                }
            }
            Err(e) => {
                self.stats.record_failure(count);
                tracing::warn!(
                    documents = count,
                    first_id = ?batch.first().map(|d| d.id.as_str()),
                    transient = e.is_transient(),
                    error = %e,
                    "Batch submission failed, batch dropped"
                );
                if let Some(delay) = e.retry_delay() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
