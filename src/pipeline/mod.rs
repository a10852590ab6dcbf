//! Ingestion pipeline: file discovery, parsing workers and the document
//! channel they feed
//!
//! The output channel is an `async_channel` so the indexer side can share a
//! single receiver across many async workers, while file workers push into it
//! from blocking threads.

mod folder;
mod single_file;
mod summary;

pub use folder::{FolderReader, IngestionHandle};
pub use single_file::{SingleFileHandle, SingleFileReader};
pub use summary::IngestSummary;

use crate::document::Document;

/// Bounded document channel between readers and the indexer
#[must_use]
pub fn document_channel(
    capacity: usize,
) -> (async_channel::Sender<Document>, async_channel::Receiver<Document>) {
    async_channel::bounded(capacity.max(1))
}
