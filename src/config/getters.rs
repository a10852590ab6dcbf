//! Getter methods for `IngestConfig`

use crate::client::IndexingOptions;
use crate::indexer::IndexerSettings;
use crate::readers::ReaderKind;
use crate::walker::GlobPattern;
use std::path::Path;
use std::time::Duration;

use super::types::IngestConfig;

impl IngestConfig {
    #[must_use]
    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    #[must_use]
    pub fn reader(&self) -> ReaderKind {
        self.reader
    }

    #[must_use]
    pub fn pattern(&self) -> &GlobPattern {
        &self.pattern
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[must_use]
    pub fn reader_concurrency(&self) -> usize {
        self.reader_concurrency
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[must_use]
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    #[must_use]
    pub fn skip_index_recreation(&self) -> bool {
        self.skip_index_recreation
    }

    #[must_use]
    pub fn keep_fields(&self) -> bool {
        self.keep_fields
    }

    #[must_use]
    pub fn replace(&self) -> bool {
        self.replace
    }

    #[must_use]
    pub fn report_every(&self) -> u64 {
        self.report_every
    }

    #[must_use]
    pub fn report_interval(&self) -> Duration {
        self.report_interval
    }

    /// Per-call indexing options
    ///
    /// Field values are dropped unless `keep_fields` is set; a format whose
    /// schema is already save-suppressed never keeps them.
    #[must_use]
    pub fn indexing_options(&self) -> IndexingOptions {
        IndexingOptions {
            no_save: !self.keep_fields || self.reader.schema().options.no_save,
            replace: self.replace,
        }
    }

    #[must_use]
    pub fn indexer_settings(&self) -> IndexerSettings {
        IndexerSettings {
            concurrency: self.concurrency,
            chunk_size: self.chunk_size,
            limit: self.limit,
            options: self.indexing_options(),
            report_every: self.report_every,
            min_report_interval: self.report_interval,
            skip_index_recreation: self.skip_index_recreation,
        }
    }
}
