//! Shared throughput and latency counters for indexer workers

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// One metrics sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    /// Seconds since the indexer started
    pub elapsed_secs: f64,
    /// Documents submitted so far
    pub documents: u64,
    /// Rate since the previous sample
    pub docs_per_sec: f64,
    /// Mean submission latency per batch since the previous sample
    pub avg_latency_ms: f64,
    /// Estimated payload rate since the previous sample
    pub mb_per_sec: f64,
}

/// Result of [`PipelineStats::admit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Accepted, and no further document will be
    Last,
    Rejected,
}

/// Atomic counters shared by every indexer worker through an `Arc`
#[derive(Debug)]
pub struct PipelineStats {
    started: Instant,
    docs_submitted: AtomicU64,
    batches_submitted: AtomicU64,
    failed_batches: AtomicU64,
    lost_documents: AtomicU64,
    skipped_documents: AtomicU64,
    accepted: AtomicU64,
    bytes_since_sample: AtomicU64,
    total_latency_ns: AtomicU64,
    last_sample_docs: AtomicU64,
    last_sample_latency_ns: AtomicU64,
    last_sample_batches: AtomicU64,
    /// Nanoseconds after `started` of the previous sample
    last_sample_at_ns: AtomicU64,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            docs_submitted: AtomicU64::new(0),
            batches_submitted: AtomicU64::new(0),
            failed_batches: AtomicU64::new(0),
            lost_documents: AtomicU64::new(0),
            skipped_documents: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            bytes_since_sample: AtomicU64::new(0),
            total_latency_ns: AtomicU64::new(0),
            last_sample_docs: AtomicU64::new(0),
            last_sample_latency_ns: AtomicU64::new(0),
            last_sample_batches: AtomicU64::new(0),
            last_sample_at_ns: AtomicU64::new(0),
        }
    }

    #[inline]
    fn now_ns(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    /// Admit one more observed document under `limit`
    #[inline]
    pub fn admit(&self, limit: Option<u64>) -> Admission {
        let seen = self.accepted.fetch_add(1, Ordering::AcqRel);
        match limit {
            Some(limit) if seen >= limit => Admission::Rejected,
            Some(limit) if seen + 1 == limit => Admission::Last,
            _ => Admission::Accepted,
        }
    }

    #[inline]
    pub fn record_skipped(&self) {
        self.skipped_documents.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful submission, returning the submitted-document
    /// total before and after it
    pub fn record_batch(&self, docs: usize, bytes: u64, latency: Duration) -> (u64, u64) {
        let latency_ns = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.bytes_since_sample.fetch_add(bytes, Ordering::Relaxed);
        self.total_latency_ns.fetch_add(latency_ns, Ordering::Relaxed);
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
        let before = self.docs_submitted.fetch_add(docs as u64, Ordering::AcqRel);
        (before, before + docs as u64)
    }

    pub fn record_failure(&self, docs: usize) {
        self.failed_batches.fetch_add(1, Ordering::Relaxed);
        self.lost_documents.fetch_add(docs as u64, Ordering::Relaxed);
    }

    /// Take a sample if `before..after` crossed a multiple of `report_every`
    /// and `min_interval` has passed since the previous sample
    ///
    /// At most one caller wins the compare-and-swap on the sample timestamp
    /// and gets the row.
    pub fn maybe_sample(
        &self,
        before: u64,
        after: u64,
        report_every: u64,
        min_interval: Duration,
    ) -> Option<MetricsRow> {
        let report_every = report_every.max(1);
        if before / report_every == after / report_every {
            return None;
        }

        let now = self.now_ns();
        let last = self.last_sample_at_ns.load(Ordering::Acquire);
        let min_ns = u64::try_from(min_interval.as_nanos()).unwrap_or(u64::MAX);
        if now.saturating_sub(last) < min_ns {
            return None;
        }
        if self
            .last_sample_at_ns
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let docs = self.docs_submitted.load(Ordering::Acquire);
        let latency = self.total_latency_ns.load(Ordering::Acquire);
        let batches = self.batches_submitted.load(Ordering::Acquire);

        let docs_delta = docs.saturating_sub(self.last_sample_docs.swap(docs, Ordering::AcqRel));
        let latency_delta =
            latency.saturating_sub(self.last_sample_latency_ns.swap(latency, Ordering::AcqRel));
        let batches_delta =
            batches.saturating_sub(self.last_sample_batches.swap(batches, Ordering::AcqRel));
        let bytes = self.bytes_since_sample.swap(0, Ordering::AcqRel);

        let window_secs = now.saturating_sub(last) as f64 / 1e9;
        let rate = |amount: f64| if window_secs > 0.0 { amount / window_secs } else { 0.0 };

        Some(MetricsRow {
            elapsed_secs: now as f64 / 1e9,
            documents: docs,
            docs_per_sec: rate(docs_delta as f64),
            avg_latency_ms: if batches_delta > 0 {
                latency_delta as f64 / batches_delta as f64 / 1e6
            } else {
                0.0
            },
            mb_per_sec: rate(bytes as f64 / BYTES_PER_MIB),
        })
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[must_use]
    pub fn documents_submitted(&self) -> u64 {
        self.docs_submitted.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn batches_submitted(&self) -> u64 {
        self.batches_submitted.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn failed_batches(&self) -> u64 {
        self.failed_batches.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn lost_documents(&self) -> u64 {
        self.lost_documents.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn skipped_documents(&self) -> u64 {
        self.skipped_documents.load(Ordering::Acquire)
    }

    /// Mean latency per successful batch over the whole run
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let batches = self.batches_submitted();
        if batches == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.total_latency_ns.load(Ordering::Acquire) / batches)
    }
}
