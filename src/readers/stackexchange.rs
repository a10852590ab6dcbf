//! StackExchange `Posts.xml` export reader

use super::{DocumentReader, InputStream};
use crate::document::Document;
use crate::errors::ReaderError;
use chrono::NaiveDateTime;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use std::collections::HashMap;
use std::io::BufReader;
use std::sync::LazyLock;

const CREATION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("HTML_TAG: hardcoded regex is valid"));

static POST_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]+)>").expect("POST_TAG: hardcoded regex is valid"));

/// Reads one document per `<row>` element
pub struct StackExchangeReader {
    xml: Reader<BufReader<InputStream>>,
    buf: Vec<u8>,
}

impl StackExchangeReader {
    #[must_use]
    pub fn new(input: InputStream) -> Self {
        Self {
            xml: Reader::from_reader(BufReader::new(input)),
            buf: Vec::with_capacity(16 * 1024),
        }
    }
}

/// Remove markup from a post body and decode what entities remain
#[must_use]
pub fn strip_tags(html: &str) -> String {
    let stripped = HTML_TAG.replace_all(html, "");
    html_escape::decode_html_entities(&stripped).into_owned()
}

/// `<c#><winforms>` becomes `c#,winforms`
#[must_use]
pub fn split_tags(raw: &str) -> String {
    POST_TAG
        .captures_iter(raw)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Creation date in unix seconds, `None` when unparseable
#[must_use]
pub fn parse_creation_date(raw: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(raw.trim(), CREATION_DATE_FORMAT)
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

fn row_to_document(row: &BytesStart<'_>) -> Result<Document, ReaderError> {
    let mut attrs: HashMap<String, String> = HashMap::new();
    for attr in row.attributes() {
        let attr = attr.map_err(|e| ReaderError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.insert(key, value);
    }

    let get = |name: &str| attrs.get(name).map(String::as_str).unwrap_or_default();

    let mut doc = Document::new(get("Id"), 1.0)
        .set("body", strip_tags(get("Body")))
        .set("title", get("Title"))
        .set("tags", split_tags(get("Tags")));

    for (attr, field) in [("Score", "score"), ("AnswerCount", "answers")] {
        if let Ok(n) = get(attr).trim().parse::<i64>() {
            doc.insert(field, n);
        }
    }
    match parse_creation_date(get("CreationDate")) {
        Some(ts) => doc.insert("time", ts),
        None => log::debug!("Post {} has no usable CreationDate", doc.id),
    }

    Ok(doc)
}

impl DocumentReader for StackExchangeReader {
    fn read(&mut self) -> Result<Option<Document>, ReaderError> {
        loop {
            self.buf.clear();
            match self.xml.read_event_into(&mut self.buf)? {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"row" => {
                    match row_to_document(&e) {
                        Ok(doc) => return Ok(Some(doc)),
                        // A bad attribute only costs this row
                        Err(err) => log::warn!("Skipping malformed row: {err}"),
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

pub(super) fn open(input: InputStream) -> Result<Box<dyn DocumentReader>, ReaderError> {
    Ok(Box::new(StackExchangeReader::new(input)))
}
