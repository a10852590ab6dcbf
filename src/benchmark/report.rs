//! Benchmark result and its CSV / JSON renderings

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::time::Duration;

/// Outcome of one [`super::QueryBenchmark`] run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub query: String,
    pub concurrency: usize,
    pub requests: u64,
    pub failures: u64,
    pub elapsed: Duration,
    pub requests_per_second: f64,
    pub average_latency_ms: f64,
}

/// Wire shape of the JSON dump
#[derive(Serialize)]
struct ReportJson<'a> {
    query: &'a str,
    concurrency: usize,
    rps: f64,
    latency: f64,
}

impl BenchmarkReport {
    pub(crate) fn new(
        query: String,
        concurrency: usize,
        requests: u64,
        failures: u64,
        elapsed: Duration,
        total_latency: Duration,
    ) -> Self {
        let secs = elapsed.as_secs_f64();
        let requests_per_second = if secs > 0.0 {
            requests as f64 / secs
        } else {
            0.0
        };
        let average_latency_ms = if requests > 0 {
            total_latency.as_secs_f64() * 1000.0 / requests as f64
        } else {
            0.0
        };

        Self {
            query,
            concurrency,
            requests,
            failures,
            elapsed,
            requests_per_second,
            average_latency_ms,
        }
    }

    /// Write one `query,concurrency,rps,latency` line
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(
            out,
            "{},{},{:.2},{:.2}",
            csv_field(&self.query),
            self.concurrency,
            self.requests_per_second,
            self.average_latency_ms
        )?;
        out.flush()
    }

    /// Write a pretty-printed JSON object with keys `query`, `concurrency`,
    /// `rps` and `latency`
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn write_json<W: Write>(&self, mut out: W) -> io::Result<()> {
        let json = ReportJson {
            query: &self.query,
            concurrency: self.concurrency,
            rps: self.requests_per_second,
            latency: self.average_latency_ms,
        };
        serde_json::to_writer_pretty(&mut out, &json).map_err(io::Error::other)?;
        writeln!(out)?;
        out.flush()
    }
}

/// Quote a CSV field when it contains a separator, quote or line break
fn csv_field(value: &str) -> std::borrow::Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        std::borrow::Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        std::borrow::Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(query: &str) -> BenchmarkReport {
        BenchmarkReport::new(
            query.to_string(),
            4,
            80,
            0,
            Duration::from_millis(200),
            Duration::from_millis(800),
        )
    }

    #[test]
    fn derived_rates() {
        let r = report("hello");
        assert!((r.requests_per_second - 400.0).abs() < 1e-9);
        assert!((r.average_latency_ms - 10.0).abs() < 1e-9);
    }

    #[test]
    fn csv_row_format() {
        let mut out = Vec::new();
        report("hello").write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hello,4,400.00,10.00\n");

        let mut out = Vec::new();
        report("a,\"b\"").write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"a,\"\"b\"\"\",4,400.00,10.00\n"
        );
    }

    #[test]
    fn json_keys() {
        let mut out = Vec::new();
        report("hello").write_json(&mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["query"], "hello");
        assert_eq!(value["concurrency"], 4);
        assert_eq!(value["rps"], 400.0);
        assert_eq!(value["latency"], 10.0);
    }

    #[test]
    fn no_requests_means_zero_latency() {
        let r = BenchmarkReport::new("q".into(), 1, 0, 3, Duration::ZERO, Duration::ZERO);
        assert_eq!(r.requests_per_second, 0.0);
        assert_eq!(r.average_latency_ms, 0.0);
    }
}
