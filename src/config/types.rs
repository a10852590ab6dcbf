//! Core configuration types for ingestion and benchmark runs

use crate::readers::ReaderKind;
use crate::utils::{DEFAULT_BENCHMARK_SECS, DEFAULT_INDEXER_CONCURRENCY};
use crate::walker::GlobPattern;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration of one ingestion run
///
/// Built with [`IngestConfig::builder`]; every value is validated once at
/// build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Root file or directory of the corpus
    pub(crate) input_path: PathBuf,
    pub(crate) index_name: String,
    pub(crate) reader: ReaderKind,
    /// Base-name filter, defaults to the reader's pattern
    pub(crate) pattern: GlobPattern,
    /// Indexer worker count
    pub(crate) concurrency: usize,
    /// File reader worker count
    pub(crate) reader_concurrency: usize,
    pub(crate) chunk_size: usize,
    /// Document channel capacity, the only backpressure knob
    pub(crate) channel_capacity: usize,
    pub(crate) limit: Option<u64>,
    pub(crate) skip_index_recreation: bool,
    /// Retain field values in the index
    pub(crate) keep_fields: bool,
    /// Overwrite documents with an existing id
    pub(crate) replace: bool,
    pub(crate) report_every: u64,
    pub(crate) report_interval: Duration,
}

/// Output format for metrics rows and benchmark reports
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

/// Configuration of a query benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub query: String,
    pub concurrency: usize,
    pub duration: Duration,
    pub format: ReportFormat,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            query: String::new(),
            concurrency: DEFAULT_INDEXER_CONCURRENCY,
            duration: Duration::from_secs(DEFAULT_BENCHMARK_SECS),
            format: ReportFormat::Csv,
        }
    }
}
