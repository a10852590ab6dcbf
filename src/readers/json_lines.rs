//! Record stream over newline-delimited (or concatenated) JSON values

use super::InputStream;
use crate::errors::ReaderError;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};

/// Yields decoded records line by line; a malformed line is logged and
/// skipped, the rest of the stream is still read
pub(crate) struct JsonLines<T> {
    input: BufReader<InputStream>,
    line: Vec<u8>,
    line_no: u64,
    pending: VecDeque<T>,
}

impl<T: DeserializeOwned> JsonLines<T> {
    pub(crate) fn new(input: InputStream) -> Self {
        Self {
            input: BufReader::new(input),
            line: Vec::with_capacity(4096),
            line_no: 0,
            pending: VecDeque::new(),
        }
    }

    pub(crate) fn next_record(&mut self) -> Result<Option<T>, ReaderError> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Ok(Some(record));
            }

            self.line.clear();
            if self.input.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            // A line may hold several concatenated values
            for item in serde_json::Deserializer::from_slice(&self.line).into_iter::<T>() {
                match item {
                    Ok(record) => self.pending.push_back(record),
                    Err(e) => {
                        log::warn!("Skipping malformed JSON record on line {}: {}", self.line_no, e);
                        break;
                    }
                }
            }
        }
    }
}

/// Integer timestamp that may be encoded as a number or a quoted string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Timestamp(pub i64);

impl<'de> serde::Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Float(f64),
            Text(String),
            Null(()),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(i) => Ok(Timestamp(i)),
            Raw::Float(f) => Ok(Timestamp(f as i64)),
            Raw::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Timestamp)
                .map_err(serde::de::Error::custom),
            Raw::Null(()) => Ok(Timestamp(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Cursor;

    #[derive(Debug, Deserialize)]
    struct Rec {
        n: i64,
    }

    fn stream(s: &str) -> JsonLines<Rec> {
        JsonLines::new(Box::new(Cursor::new(s.as_bytes().to_vec())))
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let mut lines = stream("{\"n\":1}\n{oops\n\n{\"n\":2}{\"n\":3}\n");
        let mut seen = Vec::new();
        while let Some(r) = lines.next_record().expect("read") {
            seen.push(r.n);
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn timestamps_accept_numbers_and_strings() {
        let t: Timestamp = serde_json::from_str("\"1514740140\"").expect("string");
        assert_eq!(t, Timestamp(1_514_740_140));
        let t: Timestamp = serde_json::from_str("1514740140").expect("number");
        assert_eq!(t, Timestamp(1_514_740_140));
        assert!(serde_json::from_str::<Timestamp>("\"soon\"").is_err());
    }
}
