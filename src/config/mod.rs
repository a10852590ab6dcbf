//! Run configuration
//!
//! `IngestConfig` and its typestate builder describe an ingestion run;
//! `BenchmarkConfig` describes a query benchmark.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::{IngestConfigBuilder, WithIndexName, WithInputPath};
pub use types::{BenchmarkConfig, IngestConfig, ReportFormat};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigError;
    use crate::readers::ReaderKind;

    #[test]
    fn defaults_follow_reader() -> anyhow::Result<()> {
        let config = IngestConfig::builder()
            .input_path("/data")
            .index_name("idx")
            .reader(ReaderKind::Reddit)
            .build()?;

        assert_eq!(config.pattern().as_str(), "*.bz2");
        assert_eq!(config.concurrency(), 100);
        assert_eq!(config.reader_concurrency(), 10);
        assert_eq!(config.channel_capacity(), 100 * 100);
        assert!(config.indexing_options().no_save);
        Ok(())
    }

    #[test]
    fn keep_fields_respects_save_suppressed_schema() -> anyhow::Result<()> {
        let reddit = IngestConfig::builder()
            .input_path("/data")
            .index_name("idx")
            .reader(ReaderKind::Reddit)
            .keep_fields(true)
            .build()?;
        assert!(!reddit.indexing_options().no_save);

        let twitter = IngestConfig::builder()
            .input_path("/data")
            .index_name("idx")
            .reader(ReaderKind::Twitter)
            .keep_fields(true)
            .build()?;
        assert!(twitter.indexing_options().no_save);
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_pattern = IngestConfig::builder()
            .input_path("/data")
            .index_name("idx")
            .pattern("[abc")
            .build();
        assert!(matches!(bad_pattern, Err(ConfigError::InvalidPattern { .. })));

        let zero_chunk = IngestConfig::builder()
            .input_path("/data")
            .index_name("idx")
            .chunk_size(0)
            .build();
        assert!(matches!(
            zero_chunk,
            Err(ConfigError::InvalidValue { field: "chunk_size", .. })
        ));

        let empty_name = IngestConfig::builder().input_path("/data").index_name(" ").build();
        assert!(matches!(
            empty_name,
            Err(ConfigError::InvalidValue { field: "index_name", .. })
        ));
    }

    #[test]
    fn serde_round_trip_keeps_pattern() -> anyhow::Result<()> {
        let config = IngestConfig::builder()
            .input_path("/data")
            .index_name("idx")
            .pattern("dump-?.xml")
            .limit(Some(5))
            .build()?;
        let json = serde_json::to_string(&config)?;
        let back: IngestConfig = serde_json::from_str(&json)?;
        assert_eq!(back, config);
        assert!(back.pattern().matches("dump-1.xml"));
        Ok(())
    }
}
