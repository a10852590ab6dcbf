//! Decompression layer selected by file extension

use crate::errors::ReaderError;
use crate::utils::READ_BUFFER_BYTES;
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: &[u8] = b"\x1f\x8b";
const BZIP2_MAGIC: &[u8] = b"BZh";

/// Compression format of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => Compression::Gzip,
            Some(ext) if ext.eq_ignore_ascii_case("bz2") => Compression::Bzip2,
            _ => Compression::None,
        }
    }

    fn magic(self) -> Option<&'static [u8]> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some(GZIP_MAGIC),
            Compression::Bzip2 => Some(BZIP2_MAGIC),
        }
    }
}

/// Wrap a raw stream in a buffered, decompressing stream chosen by `path`
///
/// Multi-member gzip and multi-stream bzip2 inputs are read to the end.
///
/// # Errors
///
/// Returns `ReaderError::Decompression` when the stream does not start with
/// the header its extension promises.
pub fn wrap<R>(reader: R, path: &Path) -> Result<Box<dyn Read + Send>, ReaderError>
where
    R: Read + Send + 'static,
{
    let compression = Compression::from_path(path);
    let mut buffered = BufReader::with_capacity(READ_BUFFER_BYTES, reader);

    if let Some(magic) = compression.magic() {
        let head = buffered.fill_buf()?;
        if !head.starts_with(magic) {
            return Err(ReaderError::Decompression {
                path: path.to_path_buf(),
                reason: format!("missing {compression:?} header"),
            });
        }
    }

    let stream: Box<dyn Read + Send> = match compression {
        Compression::None => Box::new(buffered),
        Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(buffered))),
        Compression::Bzip2 => Box::new(BufReader::new(MultiBzDecoder::new(buffered))),
    };
    Ok(stream)
}

/// Open `path` and wrap it with [`wrap`]
///
/// # Errors
///
/// Returns `ReaderError::Open` if the file cannot be opened, or any error
/// from [`wrap`].
pub fn open(path: &Path) -> Result<Box<dyn Read + Send>, ReaderError> {
    let file = File::open(path).map_err(|source| ReaderError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    wrap(file, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression as GzLevel;
    use flate2::write::GzEncoder;
    use std::io::{Cursor, Write};

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), GzLevel::default());
        enc.write_all(data).expect("encode");
        enc.finish().expect("finish")
    }

    fn read_all(mut r: Box<dyn Read + Send>) -> String {
        let mut s = String::new();
        r.read_to_string(&mut s).expect("read");
        s
    }

    #[test]
    fn plain_files_pass_through() {
        let out = wrap(Cursor::new(b"hello".to_vec()), Path::new("a.xml")).expect("wrap");
        assert_eq!(read_all(out), "hello");
    }

    #[test]
    fn concatenated_gzip_members_are_all_read() {
        let mut data = gzip(b"first ");
        data.extend(gzip(b"second"));
        let out = wrap(Cursor::new(data), Path::new("a.json.gz")).expect("wrap");
        assert_eq!(read_all(out), "first second");
    }

    #[test]
    fn bzip2_is_decoded() {
        let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        enc.write_all(b"bz payload").expect("encode");
        let data = enc.finish().expect("finish");

        let out = wrap(Cursor::new(data), Path::new("RC_2015-01.BZ2")).expect("wrap");
        assert_eq!(read_all(out), "bz payload");
    }

    #[test]
    fn wrong_header_is_a_decompression_error() {
        let res = wrap(Cursor::new(b"not gzip".to_vec()), Path::new("a.gz"));
        assert!(matches!(res, Err(ReaderError::Decompression { .. })));

        let res = wrap(Cursor::new(Vec::new()), Path::new("a.bz2"));
        assert!(matches!(res, Err(ReaderError::Decompression { .. })));
    }
}
