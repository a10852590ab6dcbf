// Search-index ingestion and query benchmark CLI
//
// Metrics and reports go to stdout; logs go to stderr.

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use kodegen_tools_searchbench::utils::{
    DEFAULT_BENCHMARK_SECS, DEFAULT_CHUNK_SIZE, DEFAULT_HOSTS, DEFAULT_INDEX_NAME,
    DEFAULT_INDEXER_CONCURRENCY, DEFAULT_READER_CONCURRENCY, DEFAULT_REPORT_EVERY,
    DEFAULT_REPORT_INTERVAL_SECS,
};
use kodegen_tools_searchbench::{
    BenchmarkConfig, IndexClient, IndexLocation, IngestConfig, MetricsSink, ReaderKind,
    RediSearchClient, ReportFormat, TantivyIndexClient,
    indexer::{CsvMetricsSink, JsonLinesMetricsSink},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Remote RediSearch module
    Redisearch,
    /// Embedded tantivy index
    Tantivy,
}

/// Ingest a document dump into a search index, or benchmark a query against it
#[derive(Parser, Debug)]
#[command(name = "kodegen-searchbench", version)]
struct Cli {
    /// Dump format to ingest; no ingestion runs if unset
    #[arg(long, value_enum)]
    reader: Option<ReaderKind>,

    /// Corpus file or directory
    #[arg(long, default_value = "./")]
    path: PathBuf,

    /// File name pattern, defaults to the reader's pattern
    #[arg(long)]
    pattern: Option<String>,

    #[arg(long, default_value = DEFAULT_INDEX_NAME)]
    index: String,

    #[arg(long, value_enum, default_value_t = Backend::Redisearch)]
    backend: Backend,

    /// Comma separated host:port list
    #[arg(long, default_value = DEFAULT_HOSTS)]
    hosts: String,

    /// Directory holding tantivy indexes; in memory if unset
    #[arg(long)]
    index_dir: Option<PathBuf>,

    /// Concurrent indexer / benchmark connections
    #[arg(long, default_value_t = DEFAULT_INDEXER_CONCURRENCY)]
    conns: usize,

    /// Concurrent file readers
    #[arg(long, default_value_t = DEFAULT_READER_CONCURRENCY)]
    rnum: usize,

    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Stop after this many documents
    #[arg(long)]
    limit: Option<u64>,

    /// Keep the existing index instead of recreating it
    #[arg(long)]
    skip_create: bool,

    /// Store field values in the index
    #[arg(long)]
    keep_fields: bool,

    /// Query to benchmark; no benchmark runs if unset
    #[arg(long)]
    query: Option<String>,

    /// Benchmark duration in seconds
    #[arg(long, default_value_t = DEFAULT_BENCHMARK_SECS)]
    duration: u64,

    #[arg(long, value_enum, default_value_t = ReportFormat::Csv)]
    format: ReportFormat,

    /// Emit a metrics row every N indexed documents
    #[arg(long, default_value_t = DEFAULT_REPORT_EVERY)]
    report_every: u64,

    /// Minimum seconds between metrics rows
    #[arg(long, default_value_t = DEFAULT_REPORT_INTERVAL_SECS)]
    report_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.reader.is_none() && cli.query.is_none() {
        bail!("nothing to do: pass --reader to ingest and/or --query to benchmark");
    }

    let client = connect(&cli).await?;

    if let Some(reader) = cli.reader {
        let mut builder = IngestConfig::builder()
            .input_path(&cli.path)
            .index_name(&cli.index)
            .reader(reader)
            .concurrency(cli.conns)
            .reader_concurrency(cli.rnum)
            .chunk_size(cli.chunk_size)
            .limit(cli.limit)
            .skip_index_recreation(cli.skip_create)
            .keep_fields(cli.keep_fields)
            .report_every(cli.report_every)
            .report_interval(Duration::from_secs(cli.report_interval_secs));
        if let Some(pattern) = &cli.pattern {
            builder = builder.pattern(pattern);
        }
        let config = builder.build()?;

        let sink: Arc<dyn MetricsSink> = match cli.format {
            ReportFormat::Csv => Arc::new(
                CsvMetricsSink::new(std::io::stdout()).context("writing metrics header")?,
            ),
            ReportFormat::Json => Arc::new(JsonLinesMetricsSink::new(std::io::stdout())),
        };

        let summary = kodegen_tools_searchbench::ingest(&config, Arc::clone(&client), sink)
            .await
            .with_context(|| format!("ingesting {}", config.input_path().display()))?;
        tracing::info!(
            files = summary.ingest.files_processed,
            failed_files = summary.ingest.files_failed,
            documents = summary.index.documents_submitted,
            lost = summary.index.lost_documents,
            "Ingestion complete"
        );
    }

    if let Some(query) = cli.query {
        let config = BenchmarkConfig {
            query,
            concurrency: cli.conns,
            duration: Duration::from_secs(cli.duration),
            format: cli.format,
        };
        let report = kodegen_tools_searchbench::benchmark(&config, client).await?;
        let stdout = std::io::stdout().lock();
        match config.format {
            ReportFormat::Csv => report.write_csv(stdout)?,
            ReportFormat::Json => report.write_json(stdout)?,
        }
    }

    Ok(())
}

async fn connect(cli: &Cli) -> Result<Arc<dyn IndexClient>> {
    match cli.backend {
        Backend::Redisearch => {
            let client = RediSearchClient::connect(&cli.hosts, &cli.index)
                .await
                .with_context(|| format!("connecting to {}", cli.hosts))?;
            Ok(Arc::new(client))
        }
        Backend::Tantivy => {
            let location = match &cli.index_dir {
                Some(dir) => IndexLocation::Directory(dir.clone()),
                None => {
                    tracing::warn!("No --index-dir given, using an in-memory tantivy index");
                    IndexLocation::InMemory
                }
            };
            Ok(Arc::new(TantivyIndexClient::new(cli.index.as_str(), location)))
        }
    }
}
