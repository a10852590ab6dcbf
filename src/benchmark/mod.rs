//! Query throughput benchmark
//!
//! `concurrency` tasks issue the same id-only query until a deadline and
//! report each latency to a single aggregator over a bounded channel.

mod report;

pub use report::BenchmarkReport;

use crate::client::{IndexClient, SearchQuery};
use crate::errors::{IngestError, IngestResult};
use async_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(1);

pub struct QueryBenchmark {
    client: Arc<dyn IndexClient>,
    query: String,
    concurrency: usize,
    duration: Duration,
}

impl QueryBenchmark {
    #[must_use]
    pub fn new(
        client: Arc<dyn IndexClient>,
        query: impl Into<String>,
        concurrency: usize,
        duration: Duration,
    ) -> Self {
        Self {
            client,
            query: query.into(),
            concurrency: concurrency.max(1),
            duration,
        }
    }

    /// The request every worker sends
    #[must_use]
    pub fn search_query(&self) -> SearchQuery {
        SearchQuery::new(self.query.as_str())
            .no_content()
            .verbatim()
            .limit(0, 1)
    }

    /// Run until the deadline and aggregate the results
    ///
    /// # Errors
    ///
    /// Returns `TaskFailed` if a query worker panicked.
    pub async fn run(&self) -> IngestResult<BenchmarkReport> {
        let (tx, rx) = async_channel::bounded::<Duration>(self.concurrency);
        let failures = Arc::new(AtomicU64::new(0));
        let started = Instant::now();
        let deadline = started + self.duration;

        tracing::info!(
            query = %self.query,
            index = self.client.index_name(),
            concurrency = self.concurrency,
            duration_ms = self.duration.as_millis() as u64,
            "Starting query benchmark"
        );

        let mut workers = JoinSet::new();
        for _ in 0..self.concurrency {
            workers.spawn(query_worker(
                Arc::clone(&self.client),
                self.search_query(),
                deadline,
                tx.clone(),
                Arc::clone(&failures),
            ));
        }

        let supervisor = tokio::spawn(async move {
            let mut failure = None;
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Query worker failed");
                    failure.get_or_insert_with(|| format!("query worker: {e}"));
                }
            }
            tx.close();
            failure
        });

        let mut requests: u64 = 0;
        let mut total_latency = Duration::ZERO;
        let mut last_log = Instant::now();
        while let Ok(latency) = rx.recv().await {
            requests += 1;
            total_latency += latency;
            if last_log.elapsed() >= PROGRESS_LOG_INTERVAL {
                let secs = started.elapsed().as_secs_f64();
                tracing::info!(
                    requests,
                    rate = requests as f64 / secs,
                    avg_latency_ms = total_latency.as_secs_f64() * 1000.0 / requests as f64,
                    "Benchmark progress"
                );
                last_log = Instant::now();
            }
        }
        let elapsed = started.elapsed();

        match supervisor.await {
            Ok(None) => {}
            Ok(Some(reason)) => return Err(IngestError::TaskFailed(reason)),
            Err(e) => return Err(IngestError::TaskFailed(format!("benchmark supervisor: {e}"))),
        }

        let report = BenchmarkReport::new(
            self.query.clone(),
            self.concurrency,
            requests,
            failures.load(Ordering::Relaxed),
            elapsed,
            total_latency,
        );
        tracing::info!(
            query = %report.query,
            requests = report.requests,
            failures = report.failures,
            rps = report.requests_per_second,
            latency_ms = report.average_latency_ms,
            "Benchmark finished"
        );
        Ok(report)
    }
}

async fn query_worker(
    client: Arc<dyn IndexClient>,
    query: SearchQuery,
    deadline: Instant,
    tx: Sender<Duration>,
    failures: Arc<AtomicU64>,
) {
    while Instant::now() < deadline {
        let sent_at = Instant::now();
        match client.search(&query).await {
            Ok(_) => {
                if tx.send(sent_at.elapsed()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                failures.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(error = %e, "Benchmark query failed");
                tokio::task::yield_now().await;
            }
        }
    }
}
