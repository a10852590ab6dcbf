//! Type-safe builder for `IngestConfig` using the typestate pattern
//!
//! `build()` only exists once both the input path and the index name were
//! given.

use crate::errors::ConfigError;
use crate::readers::ReaderKind;
use crate::utils::{
    DEFAULT_CHUNK_SIZE, DEFAULT_INDEXER_CONCURRENCY, DEFAULT_READER_CONCURRENCY,
    DEFAULT_REPORT_EVERY, DEFAULT_REPORT_INTERVAL_SECS,
};
use crate::walker::GlobPattern;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use super::types::IngestConfig;

// Type states for the builder
pub struct WithInputPath;
pub struct WithIndexName;

pub struct IngestConfigBuilder<State = ()> {
    pub(crate) input_path: Option<PathBuf>,
    pub(crate) index_name: Option<String>,
    pub(crate) reader: ReaderKind,
    pub(crate) pattern: Option<String>,
    pub(crate) concurrency: usize,
    pub(crate) reader_concurrency: usize,
    pub(crate) chunk_size: usize,
    pub(crate) channel_capacity: Option<usize>,
    pub(crate) limit: Option<u64>,
    pub(crate) skip_index_recreation: bool,
    pub(crate) keep_fields: bool,
    pub(crate) replace: bool,
    pub(crate) report_every: u64,
    pub(crate) report_interval: Duration,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for IngestConfigBuilder<()> {
    fn default() -> Self {
        Self {
            input_path: None,
            index_name: None,
            reader: ReaderKind::WikiAbstract,
            pattern: None,
            concurrency: DEFAULT_INDEXER_CONCURRENCY,
            reader_concurrency: DEFAULT_READER_CONCURRENCY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            channel_capacity: None,
            limit: None,
            skip_index_recreation: false,
            keep_fields: false,
            replace: false,
            report_every: DEFAULT_REPORT_EVERY,
            report_interval: Duration::from_secs(DEFAULT_REPORT_INTERVAL_SECS),
            _phantom: PhantomData,
        }
    }
}

impl IngestConfig {
    /// Create a builder for configuring an `IngestConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> IngestConfigBuilder<()> {
        IngestConfigBuilder::default()
    }
}

impl<State> IngestConfigBuilder<State> {
    fn into_state<Next>(self) -> IngestConfigBuilder<Next> {
        IngestConfigBuilder {
            input_path: self.input_path,
            index_name: self.index_name,
            reader: self.reader,
            pattern: self.pattern,
            concurrency: self.concurrency,
            reader_concurrency: self.reader_concurrency,
            chunk_size: self.chunk_size,
            channel_capacity: self.channel_capacity,
            limit: self.limit,
            skip_index_recreation: self.skip_index_recreation,
            keep_fields: self.keep_fields,
            replace: self.replace,
            report_every: self.report_every,
            report_interval: self.report_interval,
            _phantom: PhantomData,
        }
    }
}

impl IngestConfigBuilder<()> {
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> IngestConfigBuilder<WithInputPath> {
        self.input_path = Some(path.into());
        self.into_state()
    }
}

impl IngestConfigBuilder<WithInputPath> {
    pub fn index_name(mut self, name: impl Into<String>) -> IngestConfigBuilder<WithIndexName> {
        self.index_name = Some(name.into());
        self.into_state()
    }
}

// Build method only available when all required fields are set
impl IngestConfigBuilder<WithIndexName> {
    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid glob pattern, an empty index name
    /// or a zero-valued size, count or limit.
    pub fn build(self) -> Result<IngestConfig, ConfigError> {
        let input_path = self.input_path.ok_or_else(|| ConfigError::InvalidValue {
            field: "input_path",
            reason: "input path is required".to_string(),
        })?;
        let index_name = self
            .index_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "index_name",
                reason: "index name must not be empty".to_string(),
            })?;

        // Compile the pattern once at config creation
        let pattern = match self.pattern.as_deref() {
            Some(p) => GlobPattern::new(p)?,
            None => GlobPattern::new(self.reader.default_pattern())?,
        };

        require_positive("concurrency", self.concurrency)?;
        require_positive("reader_concurrency", self.reader_concurrency)?;
        require_positive("chunk_size", self.chunk_size)?;
        if let Some(capacity) = self.channel_capacity {
            require_positive("channel_capacity", capacity)?;
        }
        if self.limit == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "limit",
                reason: "limit must be at least 1 when set".to_string(),
            });
        }
        if self.report_every == 0 {
            return Err(ConfigError::InvalidValue {
                field: "report_every",
                reason: "must be greater than zero".to_string(),
            });
        }

        let channel_capacity = self
            .channel_capacity
            .unwrap_or_else(|| self.concurrency.saturating_mul(self.chunk_size));

        Ok(IngestConfig {
            input_path,
            index_name,
            reader: self.reader,
            pattern,
            concurrency: self.concurrency,
            reader_concurrency: self.reader_concurrency,
            chunk_size: self.chunk_size,
            channel_capacity,
            limit: self.limit,
            skip_index_recreation: self.skip_index_recreation,
            keep_fields: self.keep_fields,
            replace: self.replace,
            report_every: self.report_every,
            report_interval: self.report_interval,
        })
    }
}

fn require_positive(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than zero".to_string(),
        })
    } else {
        Ok(())
    }
}

// Optional setters, available in any state
impl<State> IngestConfigBuilder<State> {
    /// Select the dump format; also picks the default file pattern
    #[must_use]
    pub fn reader(mut self, reader: ReaderKind) -> Self {
        self.reader = reader;
        self
    }

    /// Override the reader's default base-name pattern
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers;
        self
    }

    #[must_use]
    pub fn reader_concurrency(mut self, workers: usize) -> Self {
        self.reader_concurrency = workers;
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Capacity of the document channel
    ///
    /// Default: `concurrency * chunk_size`
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn skip_index_recreation(mut self, skip: bool) -> Self {
        self.skip_index_recreation = skip;
        self
    }

    #[must_use]
    pub fn keep_fields(mut self, keep: bool) -> Self {
        self.keep_fields = keep;
        self
    }

    #[must_use]
    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Emit a metrics row every `documents` submitted documents
    #[must_use]
    pub fn report_every(mut self, documents: u64) -> Self {
        self.report_every = documents;
        self
    }

    /// Minimum wall time between two metrics rows
    #[must_use]
    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }
}
