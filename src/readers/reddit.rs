//! Reddit comment archive reader

use super::json_lines::{JsonLines, Timestamp};
use super::{DocumentReader, InputStream};
use crate::document::Document;
use crate::errors::ReaderError;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RedditComment {
    id: String,
    author: String,
    body: String,
    subreddit: String,
    score: i64,
    created_utc: Timestamp,
}

/// One document per comment; the comment score becomes the document score
pub struct RedditReader {
    records: JsonLines<RedditComment>,
}

impl RedditReader {
    #[must_use]
    pub fn new(input: InputStream) -> Self {
        Self {
            records: JsonLines::new(input),
        }
    }
}

impl DocumentReader for RedditReader {
    fn read(&mut self) -> Result<Option<Document>, ReaderError> {
        let Some(c) = self.records.next_record()? else {
            return Ok(None);
        };

        Ok(Some(
            Document::new(c.id, c.score as f32)
                .set("body", c.body)
                .set("author", c.author)
                .set("sub", c.subreddit)
                .set("date", c.created_utc.0),
        ))
    }
}

pub(super) fn open(input: InputStream) -> Result<Box<dyn DocumentReader>, ReaderError> {
    Ok(Box::new(RedditReader::new(input)))
}
