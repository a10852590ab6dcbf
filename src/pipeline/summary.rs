//! Ingestion counters shared by the walker and every file worker

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Lock-free counters updated from blocking worker threads
#[derive(Debug, Default)]
pub(crate) struct IngestStats {
    pub files_discovered: AtomicU64,
    pub files_processed: AtomicU64,
    pub files_failed: AtomicU64,
    pub files_skipped: AtomicU64,
    pub documents: AtomicU64,
    pub active_workers: AtomicUsize,
    pub walk_complete: AtomicBool,
}

impl IngestStats {
    #[inline]
    pub fn snapshot(&self) -> IngestSummary {
        IngestSummary {
            files_discovered: self.files_discovered.load(Ordering::Relaxed),
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            documents: self.documents.load(Ordering::Relaxed),
            walk_complete: self.walk_complete.load(Ordering::Acquire),
        }
    }
}

/// Marks a worker as busy with a file until dropped
pub(crate) struct ActiveWorker<'a>(&'a AtomicUsize);

impl<'a> ActiveWorker<'a> {
    #[inline]
    pub fn enter(gauge: &'a AtomicUsize) -> Self {
        gauge.fetch_add(1, Ordering::AcqRel);
        Self(gauge)
    }
}

impl Drop for ActiveWorker<'_> {
    #[inline]
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Files the walker emitted
    pub files_discovered: u64,
    /// Files read to end-of-stream, or until the consumer went away
    pub files_processed: u64,
    /// Files abandoned on an open, decompression or read error
    pub files_failed: u64,
    /// Files never opened because the consumer went away
    pub files_skipped: u64,
    /// Documents pushed onto the output channel
    pub documents: u64,
    /// The walker enumerated the whole tree without error
    pub walk_complete: bool,
}
