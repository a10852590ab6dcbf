//! Shared configuration constants for searchbench
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Default number of concurrent indexing connections (and benchmark workers)
pub const DEFAULT_INDEXER_CONCURRENCY: usize = 100;

/// Default number of files parsed concurrently
///
/// Bounds the number of simultaneously open input files, which protects the
/// process file-descriptor limit on very wide corpora.
pub const DEFAULT_READER_CONCURRENCY: usize = 10;

/// Documents per submitted batch
///
/// One batch is one round trip to the index service. Larger batches amortise
/// latency but hold more documents in memory per worker.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Emit a metrics row every this many indexed documents
pub const DEFAULT_REPORT_EVERY: u64 = 1000;

/// Minimum wall time between two metrics rows, in seconds
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 5;

/// Default benchmark duration, in seconds
pub const DEFAULT_BENCHMARK_SECS: u64 = 5;

/// Default index name
pub const DEFAULT_INDEX_NAME: &str = "idx";

/// Default RediSearch host list
pub const DEFAULT_HOSTS: &str = "localhost:6379";

/// Buffer size for decompressed input streams
pub const READ_BUFFER_BYTES: usize = 1024 * 1024;

/// Memory budget for the embedded tantivy writer (50MB)
pub const TANTIVY_WRITER_MEMORY: usize = 50_000_000;
