//! Full MediaWiki page dump reader (`enwiki-*-pages-articles*.xml.bz2`)

use super::{DocumentReader, InputStream};
use crate::document::Document;
use crate::errors::ReaderError;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::BufReader;

const ARTICLE_BASE_URL: &str = "https://en.wikipedia.org/wiki/";

/// Article url for a page title
#[must_use]
pub fn article_url(title: &str) -> String {
    format!("{ARTICLE_BASE_URL}{}", title.trim().replace(' ', "_"))
}

#[derive(Debug, Default)]
struct PartialPage {
    id: Option<String>,
    title: String,
    text: Option<String>,
    in_revision: bool,
}

/// Reads `<page>` elements; one document per page, body is the text of the
/// first revision, id is `WP_<page id>`
pub struct WikiDumpReader {
    xml: Reader<BufReader<InputStream>>,
    buf: Vec<u8>,
    text: String,
    page: Option<PartialPage>,
}

impl WikiDumpReader {
    #[must_use]
    pub fn new(input: InputStream) -> Self {
        Self {
            xml: Reader::from_reader(BufReader::new(input)),
            buf: Vec::with_capacity(8192),
            text: String::new(),
            page: None,
        }
    }
}

fn finish_page(page: PartialPage) -> Option<Document> {
    let Some(id) = page.id.filter(|id| !id.trim().is_empty()) else {
        log::debug!("Skipping page without id: {:?}", page.title);
        return None;
    };

    let url = article_url(&page.title);
    Some(
        Document::new(format!("WP_{}", id.trim()), 1.0)
            .set("title", page.title)
            .set("body", page.text.unwrap_or_default())
            .set("url", url),
    )
}

impl DocumentReader for WikiDumpReader {
    fn read(&mut self) -> Result<Option<Document>, ReaderError> {
        loop {
            self.buf.clear();
            match self.xml.read_event_into(&mut self.buf)? {
                Event::Start(e) => {
                    match e.name().as_ref() {
                        b"page" => self.page = Some(PartialPage::default()),
                        b"revision" => {
                            if let Some(page) = self.page.as_mut() {
                                page.in_revision = true;
                            }
                        }
                        _ => {}
                    }
                    self.text.clear();
                }
                Event::Text(e) => match e.unescape() {
                    Ok(t) => self.text.push_str(&t),
                    Err(_) => self.text.push_str(&String::from_utf8_lossy(&e.into_inner())),
                },
                Event::CData(e) => self.text.push_str(&String::from_utf8_lossy(&e.into_inner())),
                Event::End(e) => {
                    let finished = match (self.page.as_mut(), e.name().as_ref()) {
                        (Some(page), b"title") => {
                            page.title = std::mem::take(&mut self.text);
                            false
                        }
                        (Some(page), b"id") if !page.in_revision && page.id.is_none() => {
                            page.id = Some(std::mem::take(&mut self.text));
                            false
                        }
                        (Some(page), b"text") if page.text.is_none() => {
                            page.text = Some(std::mem::take(&mut self.text));
                            false
                        }
                        (Some(page), b"revision") => {
                            page.in_revision = false;
                            false
                        }
                        (Some(_), b"page") => true,
                        _ => false,
                    };
                    self.text.clear();

                    if finished
                        && let Some(doc) = self.page.take().and_then(finish_page)
                    {
                        return Ok(Some(doc));
                    }
                }
                Event::Empty(e) => {
                    // <text/> on a page with an empty first revision
                    if let Some(page) = self.page.as_mut()
                        && e.name().as_ref() == b"text"
                        && page.text.is_none()
                    {
                        page.text = Some(String::new());
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

pub(super) fn open(input: InputStream) -> Result<Box<dyn DocumentReader>, ReaderError> {
    Ok(Box::new(WikiDumpReader::new(input)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FieldValue;
    use std::io::Cursor;

    const DUMP: &str = r#"<mediawiki xmlns="http://www.mediawiki.org/xml/export-0.10/">
  <siteinfo><sitename>Wikipedia</sitename></siteinfo>
  <page>
    <title>Alan Turing</title>
    <ns>0</ns>
    <id>1208</id>
    <revision>
      <id>99999</id>
      <timestamp>2018-01-01T00:00:00Z</timestamp>
      <text xml:space="preserve">'''Alan Mathison Turing''' was a mathematician &amp; logician.</text>
    </revision>
    <revision>
      <id>100000</id>
      <text xml:space="preserve">later revision</text>
    </revision>
  </page>
  <page>
    <title>Empty Page</title>
    <ns>0</ns>
    <id>12</id>
    <revision><id>5</id><text xml:space="preserve" /></revision>
  </page>
</mediawiki>"#;

    #[test]
    fn pages_use_page_id_and_first_revision() {
        let mut reader = WikiDumpReader::new(Box::new(Cursor::new(DUMP.as_bytes().to_vec())));

        let doc = reader.read().expect("read").expect("doc");
        assert_eq!(doc.id, "WP_1208");
        assert_eq!(doc.get("title").and_then(FieldValue::as_str), Some("Alan Turing"));
        assert_eq!(
            doc.get("body").and_then(FieldValue::as_str),
            Some("'''Alan Mathison Turing''' was a mathematician & logician.")
        );
        assert_eq!(
            doc.get("url").and_then(FieldValue::as_str),
            Some("https://en.wikipedia.org/wiki/Alan_Turing")
        );

        let empty = reader.read().expect("read").expect("doc");
        assert_eq!(empty.id, "WP_12");
        assert_eq!(empty.get("body").and_then(FieldValue::as_str), Some(""));

        assert!(reader.read().expect("read").is_none());
    }
}
