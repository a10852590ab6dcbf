//! Error types for ingestion and benchmarking
//!
//! Errors are split along the failure taxonomy of a run: configuration and
//! walk errors abort the run, reader errors abort a single file, client errors
//! abort a single batch (or the run, when raised while preparing the index).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Top-level error for a run
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Client(#[from] ClientError),

    /// The run finished without indexing a single document
    #[error("No documents were indexed from {0:?}; the corpus is empty or entirely unparseable")]
    NothingIndexed(PathBuf),

    /// A pipeline task panicked or was cancelled by the runtime
    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),
}

/// Invalid or missing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Unknown reader '{0}'")]
    UnknownReader(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Directory walk failures; these are fatal for the walk
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Could not stat {path:?}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read directory {path:?}: {reason}")]
    ReadDir { path: PathBuf, reason: String },
}

/// Per-file failures: opening, decompressing or parsing one input
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Failed to open file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decompress {path:?}: {reason}")]
    Decompression { path: PathBuf, reason: String },

    #[error("IO error while reading: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<quick_xml::Error> for ReaderError {
    fn from(error: quick_xml::Error) -> Self {
        ReaderError::Xml(error.to_string())
    }
}

/// Index client failures
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to {host}: {reason}")]
    Connection { host: String, reason: String },

    #[error("Index '{0}' does not exist")]
    UnknownIndex(String),

    #[error("Failed to create index '{index}': {reason}")]
    CreateIndex { index: String, reason: String },

    #[error("Indexing of {count} documents failed: {reason}")]
    Indexing { count: usize, reason: String },

    #[error("Invalid search query '{query}': {reason}")]
    QueryParsing { query: String, reason: String },

    #[error("Search execution failed: {0}")]
    Search(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// Check if error is transient (a later batch may well succeed)
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Connection { .. } | ClientError::Io(_) => true,
            ClientError::Redis(e) => e.is_timeout() || e.is_connection_dropped() || e.is_io_error(),
            _ => false,
        }
    }

    /// Suggested pause before the next submission after a transient error
    #[must_use]
    pub fn retry_delay(&self) -> Option<Duration> {
        if self.is_transient() {
            Some(Duration::from_millis(100))
        } else {
            None
        }
    }
}
