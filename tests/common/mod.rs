//! Shared fixtures for the integration tests

#![allow(dead_code)]

use anyhow::Result;
use kodegen_tools_searchbench::document::Document;
use kodegen_tools_searchbench::errors::ReaderError;
use kodegen_tools_searchbench::readers::{DocumentReader, DocumentReaderOpener, InputStream};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One document per non-empty line; the line is the id, `-` means an empty id
pub struct LineReader {
    lines: std::io::Lines<BufReader<InputStream>>,
}

impl DocumentReader for LineReader {
    fn read(&mut self) -> Result<Option<Document>, ReaderError> {
        for line in self.lines.by_ref() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let id = if line == "-" { "" } else { line };
            return Ok(Some(
                Document::new(id, 1.0).set("body", format!("text of {line}")),
            ));
        }
        Ok(None)
    }
}

/// Opener for [`LineReader`] that can sleep before opening and counts opens
#[derive(Default)]
pub struct LineOpener {
    pub open_delay: Duration,
    pub opens: AtomicUsize,
    pub concurrent: AtomicUsize,
    pub max_concurrent: AtomicUsize,
}

impl LineOpener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow(open_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            open_delay,
            ..Self::default()
        })
    }
}

impl DocumentReaderOpener for LineOpener {
    fn open(&self, input: InputStream) -> Result<Box<dyn DocumentReader>, ReaderError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        if !self.open_delay.is_zero() {
            std::thread::sleep(self.open_delay);
        }
        self.concurrent.fetch_sub(1, Ordering::SeqCst);

        Ok(Box::new(LineReader {
            lines: BufReader::new(input).lines(),
        }))
    }
}

/// Write `ids`, one per line
pub fn write_lines(path: &Path, ids: &[&str]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, ids.join("\n"))?;
    Ok(())
}

/// Numbered ids `prefix-0 .. prefix-(n-1)`
pub fn numbered(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}-{i}")).collect()
}

pub fn as_refs(ids: &[String]) -> Vec<&str> {
    ids.iter().map(String::as_str).collect()
}

/// A Wikipedia abstract dump with one `<doc>` per title
pub fn wiki_abstract_xml(titles: &[&str]) -> String {
    let mut xml = String::from("<feed>\n");
    for title in titles {
        let slug = title.replace(' ', "_");
        xml.push_str(&format!(
            "<doc>\n<title>Wikipedia: {title}</title>\n\
             <url>https://en.wikipedia.org/wiki/{slug}</url>\n\
             <abstract>{title} is an article about {title}.</abstract>\n</doc>\n"
        ));
    }
    xml.push_str("</feed>\n");
    xml
}

pub fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

pub fn bzip2(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// A directory with all permissions removed; restored on drop
#[cfg(unix)]
pub struct LockedDir {
    pub path: std::path::PathBuf,
}

#[cfg(unix)]
impl LockedDir {
    /// Lock `path`, or `None` when the process can read it anyway (root)
    pub fn lock(path: &Path) -> Result<Option<Self>> {
        use std::os::unix::fs::PermissionsExt;

        std::fs::create_dir_all(path)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o000))?;
        let locked = Self {
            path: path.to_path_buf(),
        };
        if std::fs::read_dir(path).is_ok() {
            return Ok(None);
        }
        Ok(Some(locked))
    }
}

#[cfg(unix)]
impl Drop for LockedDir {
    fn drop(&mut self) {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o755));
    }
}
