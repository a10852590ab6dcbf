//! Twitter status archive reader

use super::json_lines::{JsonLines, Timestamp};
use super::{DocumentReader, InputStream};
use crate::document::Document;
use crate::errors::ReaderError;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Tweet {
    id_str: String,
    text: String,
    lang: String,
    timestamp_ms: Timestamp,
    user: TweetUser,
    entities: Entities,
    retweeted_status: Option<Retweeted>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TweetUser {
    screen_name: String,
    time_zone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Entities {
    hashtags: Vec<HashTag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HashTag {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Retweeted {
    favorite_count: i64,
}

/// One document per status
///
/// Delete notices and other records without `id_str` come out with an empty
/// id and are dropped by the indexer.
pub struct TwitterReader {
    records: JsonLines<Tweet>,
}

impl TwitterReader {
    #[must_use]
    pub fn new(input: InputStream) -> Self {
        Self {
            records: JsonLines::new(input),
        }
    }
}

impl DocumentReader for TwitterReader {
    fn read(&mut self) -> Result<Option<Document>, ReaderError> {
        let Some(tw) = self.records.next_record()? else {
            return Ok(None);
        };

        let likes = tw.retweeted_status.map_or(0, |r| r.favorite_count);
        let mut doc = Document::new(tw.id_str, 1.0)
            .set("body", tw.text)
            .set("user", tw.user.screen_name)
            .set("lang", tw.lang)
            .set("tz", tw.user.time_zone.unwrap_or_default())
            .set("time", tw.timestamp_ms.0 / 1000)
            .set("likes", likes);

        if !tw.entities.hashtags.is_empty() {
            let tags: Vec<String> = tw.entities.hashtags.into_iter().map(|h| h.text).collect();
            doc.insert("hashtag", tags.join(","));
        }

        Ok(Some(doc))
    }
}

pub(super) fn open(input: InputStream) -> Result<Box<dyn DocumentReader>, ReaderError> {
    Ok(Box::new(TwitterReader::new(input)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FieldValue;
    use std::io::Cursor;

    #[test]
    fn statuses_become_documents() {
        let data = concat!(
            r#"{"id_str":"947514941380075520","text":"hello #rust","lang":"en","timestamp_ms":"1514740140658","#,
            r#""user":{"screen_name":"someone","time_zone":"Bangkok"},"#,
            r#""entities":{"hashtags":[{"text":"rust"},{"text":"async"}]},"#,
            r#""retweeted_status":{"favorite_count":7}}"#,
            "\n",
            r#"{"delete":{"status":{"id":1}}}"#,
            "\n",
        );
        let mut reader = TwitterReader::new(Box::new(Cursor::new(data.as_bytes().to_vec())));

        let doc = reader.read().expect("read").expect("doc");
        assert_eq!(doc.id, "947514941380075520");
        assert_eq!(doc.get("time"), Some(&FieldValue::Integer(1_514_740_140)));
        assert_eq!(doc.get("likes"), Some(&FieldValue::Integer(7)));
        assert_eq!(doc.get("tz").and_then(FieldValue::as_str), Some("Bangkok"));
        assert_eq!(doc.get("hashtag").and_then(FieldValue::as_str), Some("rust,async"));

        let deleted = reader.read().expect("read").expect("doc");
        assert!(!deleted.has_id());
        assert!(deleted.get("hashtag").is_none());

        assert!(reader.read().expect("read").is_none());
    }
}
