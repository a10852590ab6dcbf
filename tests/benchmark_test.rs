use anyhow::Result;
use kodegen_tools_searchbench::benchmark::QueryBenchmark;
use kodegen_tools_searchbench::client::{IndexClient, MockIndexClient};
use kodegen_tools_searchbench::config::{BenchmarkConfig, ReportFormat};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn request_rate_tracks_latency_and_concurrency() -> Result<()> {
    let client = Arc::new(MockIndexClient::new("idx").with_latency(Duration::from_millis(10)));
    let bench = QueryBenchmark::new(
        Arc::clone(&client) as Arc<dyn IndexClient>,
        "hello",
        4,
        Duration::from_millis(200),
    );

    let report = bench.run().await?;

    // 4 workers * 200ms / 10ms = 80, minus scheduling overhead
    assert!(
        (40..=90).contains(&report.requests),
        "unexpected request count {}",
        report.requests
    );
    assert!(
        report.average_latency_ms >= 9.0 && report.average_latency_ms < 30.0,
        "unexpected latency {}",
        report.average_latency_ms
    );
    assert_eq!(report.failures, 0);
    assert_eq!(report.concurrency, 4);
    assert_eq!(client.snapshot().searches as u64, report.requests);
    Ok(())
}

#[tokio::test]
async fn failed_queries_are_counted_not_reported() -> Result<()> {
    let client = Arc::new(
        MockIndexClient::new("idx")
            .with_latency(Duration::from_millis(5))
            .failing_search(),
    );
    let config = BenchmarkConfig {
        query: "q".to_string(),
        concurrency: 2,
        duration: Duration::from_millis(50),
        format: ReportFormat::Json,
    };

    let report = kodegen_tools_searchbench::benchmark(&config, client).await?;
    assert_eq!(report.requests, 0);
    assert!(report.failures > 0);
    assert_eq!(report.average_latency_ms, 0.0);
    Ok(())
}

#[test]
fn benchmark_query_is_id_only_and_verbatim() {
    let bench = QueryBenchmark::new(
        Arc::new(MockIndexClient::new("idx")),
        "foo bar",
        1,
        Duration::ZERO,
    );
    let query = bench.search_query();
    assert!(query.no_content);
    assert!(query.verbatim);
    assert_eq!((query.offset, query.limit), (0, 1));
}
