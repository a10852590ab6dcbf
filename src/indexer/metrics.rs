//! Metrics sinks for indexer samples

use super::stats::MetricsRow;
use parking_lot::Mutex;
use std::io::{self, Write};

pub const CSV_HEADER: &str =
    "Time Elapsed,Documents Indexed,Documents/Second,Avg. Latency,MBs/Second";

/// Receives one row per metrics sample
pub trait MetricsSink: Send + Sync {
    fn write_row(&self, row: &MetricsRow) -> io::Result<()>;
}

/// Comma separated rows behind a header line
pub struct CsvMetricsSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> CsvMetricsSink<W> {
    /// Write the header and return the sink
    ///
    /// # Errors
    ///
    /// Returns any error from writing the header.
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{CSV_HEADER}")?;
        out.flush()?;
        Ok(Self {
            out: Mutex::new(out),
        })
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

/// CSV line for a row, two decimals for rates
#[must_use]
pub fn csv_line(row: &MetricsRow) -> String {
    format!(
        "{:.2},{},{:.2},{:.2},{:.2}",
        row.elapsed_secs, row.documents, row.docs_per_sec, row.avg_latency_ms, row.mb_per_sec
    )
}

impl<W: Write + Send> MetricsSink for CsvMetricsSink<W> {
    fn write_row(&self, row: &MetricsRow) -> io::Result<()> {
        let mut out = self.out.lock();
        writeln!(out, "{}", csv_line(row))?;
        out.flush()
    }
}

/// One JSON object per line
pub struct JsonLinesMetricsSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesMetricsSink<W> {
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> MetricsSink for JsonLinesMetricsSink<W> {
    fn write_row(&self, row: &MetricsRow) -> io::Result<()> {
        let mut out = self.out.lock();
        serde_json::to_writer(&mut *out, row)?;
        writeln!(out)?;
        out.flush()
    }
}

/// Keeps rows in memory
#[derive(Default)]
pub struct MemoryMetricsSink {
    rows: Mutex<Vec<MetricsRow>>,
}

impl MemoryMetricsSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rows(&self) -> Vec<MetricsRow> {
        self.rows.lock().clone()
    }
}

impl MetricsSink for MemoryMetricsSink {
    fn write_row(&self, row: &MetricsRow) -> io::Result<()> {
        self.rows.lock().push(*row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> MetricsRow {
        MetricsRow {
            elapsed_secs: 5.004,
            documents: 2000,
            docs_per_sec: 399.2,
            avg_latency_ms: 12.5,
            mb_per_sec: 1.5,
        }
    }

    #[test]
    fn csv_has_header_then_rows() {
        let sink = CsvMetricsSink::new(Vec::new()).expect("header");
        sink.write_row(&row()).expect("row");
        let text = String::from_utf8(sink.into_inner()).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![CSV_HEADER, "5.00,2000,399.20,12.50,1.50"]);
    }

    #[test]
    fn json_lines_are_parseable() {
        let sink = JsonLinesMetricsSink::new(Vec::new());
        sink.write_row(&row()).expect("row");
        sink.write_row(&row()).expect("row");
        let text = String::from_utf8(sink.into_inner()).expect("utf8");
        for line in text.lines() {
            let parsed: MetricsRow = serde_json::from_str(line).expect("json");
            assert_eq!(parsed.documents, 2000);
        }
        assert_eq!(text.lines().count(), 2);
    }
}
