pub mod benchmark;
pub mod client;
pub mod config;
pub mod decompress;
pub mod document;
pub mod errors;
pub mod indexer;
pub mod pipeline;
pub mod readers;
pub mod schema;
pub mod utils;
pub mod walker;

pub use benchmark::{BenchmarkReport, QueryBenchmark};
pub use client::{
    IndexClient, IndexInfo, IndexLocation, IndexingOptions, MockIndexClient, RediSearchClient,
    SearchHit, SearchQuery, TantivyIndexClient,
};
pub use config::{BenchmarkConfig, IngestConfig, ReportFormat};
pub use document::{Document, FieldValue};
pub use errors::{ClientError, ConfigError, IngestError, IngestResult, ReaderError, WalkError};
pub use indexer::{BatchIndexer, IndexSummary, IndexerSettings, MetricsRow, MetricsSink};
pub use pipeline::{FolderReader, IngestSummary, SingleFileReader};
pub use readers::{DocumentReader, DocumentReaderOpener, ReaderKind};
pub use schema::{FieldKind, FieldSpec, IndexSchema, SchemaOptions, SchemaProvider};
pub use walker::GlobPattern;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Combined outcome of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ingest: IngestSummary,
    pub index: IndexSummary,
}

/// Ingest the corpus described by `config` into `client`
///
/// Recreates the index (unless disabled), reads every matching file and
/// indexes the documents in batches, writing metrics rows to `sink`.
///
/// # Errors
///
/// Fails if the index cannot be created, the walk fails, a pipeline task
/// panics, or not a single document was indexed.
pub async fn ingest(
    config: &IngestConfig,
    client: Arc<dyn IndexClient>,
    sink: Arc<dyn MetricsSink>,
) -> IngestResult<RunSummary> {
    let reader = config.reader();
    let indexer = BatchIndexer::new(client, &reader, config.indexer_settings(), sink);
    indexer.prepare().await?;

    let (tx, rx) = pipeline::document_channel(config.channel_capacity());
    let handle = FolderReader::new(
        config.input_path(),
        config.pattern().clone(),
        config.reader_concurrency(),
        reader.opener(),
    )
    .start(tx);

    let index = indexer.run(rx).await?;
    let ingest = handle.join().await?;

    if index.documents_submitted == 0 {
        return Err(IngestError::NothingIndexed(config.input_path().to_path_buf()));
    }
    Ok(RunSummary { ingest, index })
}

/// Run the query benchmark described by `config` against `client`
///
/// # Errors
///
/// Fails if a benchmark task panics.
pub async fn benchmark(
    config: &BenchmarkConfig,
    client: Arc<dyn IndexClient>,
) -> IngestResult<BenchmarkReport> {
    QueryBenchmark::new(client, config.query.as_str(), config.concurrency, config.duration)
        .run()
        .await
}
