//! Wikipedia abstract dump reader (`enwiki-*-abstract.xml`)

use super::{DocumentReader, InputStream};
use crate::document::Document;
use crate::errors::ReaderError;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::BufReader;

const TITLE_PREFIX: &str = "Wikipedia: ";

/// Reads `<doc><title/><url/><abstract/></doc>` records
///
/// Lists, redirects and disambiguation pages are skipped. The document id is
/// the last path segment of the article url.
pub struct WikiAbstractReader {
    xml: Reader<BufReader<InputStream>>,
    buf: Vec<u8>,
    text: String,
    pending: PendingDoc,
}

/// Field values collected for the `<doc>` being read
#[derive(Default)]
struct PendingDoc {
    title: String,
    url: String,
    body: String,
}

impl WikiAbstractReader {
    #[must_use]
    pub fn new(input: InputStream) -> Self {
        Self {
            xml: Reader::from_reader(BufReader::new(input)),
            buf: Vec::with_capacity(8192),
            text: String::new(),
            pending: PendingDoc::default(),
        }
    }
}

impl PendingDoc {
    fn take_document(&mut self) -> Option<Document> {
        let url = std::mem::take(&mut self.url).trim().to_string();
        let title = std::mem::take(&mut self.title);
        let body = std::mem::take(&mut self.body);

        let id = url.rsplit('/').next().unwrap_or_default().to_string();
        if id.is_empty() {
            return None;
        }

        let title = title.trim();
        let title = title.strip_prefix(TITLE_PREFIX).unwrap_or(title).to_string();
        let body = body.trim().to_string();
        if !keep_article(&title, &body) {
            log::trace!("Skipping filtered article {title:?}");
            return None;
        }

        Some(
            Document::new(id, 1.0)
                .set("title", title)
                .set("body", body)
                .set("url", url),
        )
    }
}

/// Whether an article carries real content
pub(crate) fn keep_article(title: &str, body: &str) -> bool {
    !(title.starts_with("List of")
        || body.starts_with("#REDIRECT")
        || body.starts_with("#redirect")
        || title.contains("(disambiguation)"))
}

impl DocumentReader for WikiAbstractReader {
    fn read(&mut self) -> Result<Option<Document>, ReaderError> {
        loop {
            self.buf.clear();
            match self.xml.read_event_into(&mut self.buf)? {
                Event::Start(_) => self.text.clear(),
                Event::Text(e) => match e.unescape() {
                    Ok(t) => self.text.push_str(&t),
                    Err(_) => self.text.push_str(&String::from_utf8_lossy(&e.into_inner())),
                },
                Event::CData(e) => self.text.push_str(&String::from_utf8_lossy(&e.into_inner())),
                Event::End(e) => {
                    match e.name().as_ref() {
                        b"title" => self.pending.title = std::mem::take(&mut self.text),
                        b"url" => self.pending.url = std::mem::take(&mut self.text),
                        b"abstract" => self.pending.body = std::mem::take(&mut self.text),
                        b"doc" => {
                            if let Some(doc) = self.pending.take_document() {
                                return Ok(Some(doc));
                            }
                        }
                        _ => {}
                    }
                    self.text.clear();
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

pub(super) fn open(input: InputStream) -> Result<Box<dyn DocumentReader>, ReaderError> {
    Ok(Box::new(WikiAbstractReader::new(input)))
}
