//! Format-specific document readers
//!
//! A `DocumentReader` turns one decompressed byte stream into a sequence of
//! documents. `Ok(None)` marks the end of the stream; an `Err` is fatal for
//! the current file only. Records that fail to parse are skipped inside the
//! reader and never surface as errors.

mod json_lines;
mod reddit;
mod stackexchange;
mod twitter;
mod wiki_abstract;
mod wiki_dump;

pub use reddit::RedditReader;
pub use stackexchange::StackExchangeReader;
pub use twitter::TwitterReader;
pub use wiki_abstract::WikiAbstractReader;
pub use wiki_dump::WikiDumpReader;

use crate::document::Document;
use crate::errors::{ConfigError, ReaderError};
use crate::schema::{FieldSpec, IndexSchema, SchemaOptions, SchemaProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::str::FromStr;
use std::sync::Arc;

/// Byte stream handed to a reader, already decompressed and buffered
pub type InputStream = Box<dyn Read + Send>;

/// Reads documents one at a time from a byte stream
pub trait DocumentReader: Send {
    fn read(&mut self) -> Result<Option<Document>, ReaderError>;
}

/// Builds a `DocumentReader` over a freshly opened stream
pub trait DocumentReaderOpener: Send + Sync {
    fn open(&self, input: InputStream) -> Result<Box<dyn DocumentReader>, ReaderError>;
}

impl<F> DocumentReaderOpener for F
where
    F: Fn(InputStream) -> Result<Box<dyn DocumentReader>, ReaderError> + Send + Sync,
{
    fn open(&self, input: InputStream) -> Result<Box<dyn DocumentReader>, ReaderError> {
        self(input)
    }
}

/// Supported dump formats, selected once from the `--reader` flag
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ReaderKind {
    /// Wikipedia abstract dump (`<doc>` elements)
    #[value(name = "wiki_abs")]
    #[serde(rename = "wiki_abs")]
    WikiAbstract,
    /// Full MediaWiki page dump
    #[value(name = "wiki_full")]
    #[serde(rename = "wiki_full")]
    WikiFull,
    /// Reddit comment archive (JSON lines)
    #[value(name = "reddit")]
    Reddit,
    /// Twitter status archive (JSON lines)
    #[value(name = "twitter")]
    Twitter,
    /// StackExchange `Posts.xml` export
    #[value(name = "stackexchange")]
    StackExchange,
}

impl ReaderKind {
    pub const ALL: [ReaderKind; 5] = [
        ReaderKind::WikiAbstract,
        ReaderKind::WikiFull,
        ReaderKind::Reddit,
        ReaderKind::Twitter,
        ReaderKind::StackExchange,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ReaderKind::WikiAbstract => "wiki_abs",
            ReaderKind::WikiFull => "wiki_full",
            ReaderKind::Reddit => "reddit",
            ReaderKind::Twitter => "twitter",
            ReaderKind::StackExchange => "stackexchange",
        }
    }

    /// File name pattern used when none is given
    #[must_use]
    pub fn default_pattern(self) -> &'static str {
        match self {
            ReaderKind::WikiAbstract | ReaderKind::StackExchange => "*.xml",
            ReaderKind::WikiFull | ReaderKind::Reddit | ReaderKind::Twitter => "*.bz2",
        }
    }

    #[must_use]
    pub fn opener(self) -> Arc<dyn DocumentReaderOpener> {
        match self {
            ReaderKind::WikiAbstract => Arc::new(wiki_abstract::open),
            ReaderKind::WikiFull => Arc::new(wiki_dump::open),
            ReaderKind::Reddit => Arc::new(reddit::open),
            ReaderKind::Twitter => Arc::new(twitter::open),
            ReaderKind::StackExchange => Arc::new(stackexchange::open),
        }
    }

    #[must_use]
    pub fn schema(self) -> IndexSchema {
        match self {
            ReaderKind::WikiAbstract | ReaderKind::WikiFull => wikipedia_schema(),
            ReaderKind::Reddit => reddit_schema(),
            ReaderKind::Twitter => twitter_schema(),
            ReaderKind::StackExchange => stackexchange_schema(),
        }
    }
}

impl SchemaProvider for ReaderKind {
    fn schema(&self) -> IndexSchema {
        ReaderKind::schema(*self)
    }
}

impl fmt::Display for ReaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReaderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReaderKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ConfigError::UnknownReader(s.to_string()))
    }
}

#[must_use]
pub fn wikipedia_schema() -> IndexSchema {
    IndexSchema::new(SchemaOptions::default())
        .field(FieldSpec::text_with("title", true, false, false))
        .field(FieldSpec::text("body"))
        .field(FieldSpec::text_with("url", false, true, true))
}

#[must_use]
pub fn reddit_schema() -> IndexSchema {
    IndexSchema::new(SchemaOptions::default())
        .field(FieldSpec::text("body"))
        .field(FieldSpec::text("author"))
        .field(FieldSpec::text("sub"))
        .field(FieldSpec::numeric("date"))
}

#[must_use]
pub fn twitter_schema() -> IndexSchema {
    IndexSchema::new(SchemaOptions {
        no_frequencies: true,
        no_offset_vectors: true,
        no_save: true,
    })
    .field(FieldSpec::text_with("body", false, true, false))
    .field(FieldSpec::text_with("user", true, true, false))
    .field(FieldSpec::text_with("lang", true, false, true))
    .field(FieldSpec::tag("hashtag"))
    .field(FieldSpec::text_with("location", true, false, false))
    .field(FieldSpec::tag("tz"))
    .field(FieldSpec::numeric_with("time", true, false))
    .field(FieldSpec::numeric_with("likes", true, true))
}

#[must_use]
pub fn stackexchange_schema() -> IndexSchema {
    IndexSchema::new(SchemaOptions {
        no_frequencies: true,
        no_offset_vectors: true,
        no_save: false,
    })
    .field(FieldSpec::text("body"))
    .field(FieldSpec::text("title"))
    .field(FieldSpec::tag("tags"))
    .field(FieldSpec::numeric_with("score", true, true))
    .field(FieldSpec::numeric_with("answers", true, true))
    .field(FieldSpec::numeric_with("time", true, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_names_round_trip() {
        for kind in ReaderKind::ALL {
            assert_eq!(kind.name().parse::<ReaderKind>().ok(), Some(kind));
        }
        assert!(matches!(
            "csv".parse::<ReaderKind>(),
            Err(ConfigError::UnknownReader(name)) if name == "csv"
        ));
    }

    #[test]
    fn default_patterns_follow_dump_layout() {
        assert_eq!(ReaderKind::WikiAbstract.default_pattern(), "*.xml");
        assert_eq!(ReaderKind::Reddit.default_pattern(), "*.bz2");
    }

    #[test]
    fn closures_act_as_openers() {
        struct Empty;
        impl DocumentReader for Empty {
            fn read(&mut self) -> Result<Option<Document>, ReaderError> {
                Ok(None)
            }
        }

        let opener = |_input: InputStream| -> Result<Box<dyn DocumentReader>, ReaderError> {
            Ok(Box::new(Empty))
        };
        let mut reader = opener
            .open(Box::new(std::io::empty()))
            .expect("open");
        assert!(reader.read().expect("read").is_none());
    }
}
