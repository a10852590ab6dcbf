//! Glob pattern matching on file base names

use crate::errors::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A compiled glob pattern
///
/// Supports `*`, `?`, `[...]` and `[!...]`; every other character matches
/// itself literally. Matching is against the whole base name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob pattern
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` for an empty pattern or an
    /// unterminated character class.
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = compile_glob_pattern(pattern)?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    #[inline]
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for GlobPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl TryFrom<String> for GlobPattern {
    type Error = ConfigError;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Self::new(&pattern)
    }
}

impl From<GlobPattern> for String {
    fn from(pattern: GlobPattern) -> Self {
        pattern.source
    }
}

fn invalid(pattern: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

/// Translate a glob into an anchored regex, done once at config time
fn compile_glob_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    if pattern.is_empty() {
        return Err(invalid(pattern, "pattern is empty"));
    }

    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                out.push('[');
                if matches!(chars.peek(), Some('!') | Some('^')) {
                    chars.next();
                    out.push('^');
                }
                // A leading ']' is a literal member of the class
                if chars.peek() == Some(&']') {
                    chars.next();
                    out.push_str("\\]");
                }
                let mut closed = false;
                for c in chars.by_ref() {
                    match c {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '-' => out.push('-'),
                        '\\' | '[' | '^' | '&' | '~' => {
                            out.push('\\');
                            out.push(c);
                        }
                        _ => out.push(c),
                    }
                }
                if !closed {
                    return Err(invalid(pattern, "unterminated character class"));
                }
                out.push(']');
            }
            _ => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
    }

    out.push('$');
    Regex::new(&out).map_err(|e| invalid(pattern, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(p: &str) -> GlobPattern {
        GlobPattern::new(p).expect("pattern should compile")
    }

    #[test]
    fn star_and_question_mark() {
        let g = glob("*.xml");
        assert!(g.matches("a.xml"));
        assert!(g.matches(".xml"));
        assert!(!g.matches("a.xml.gz"));

        let g = glob("part-?.bz2");
        assert!(g.matches("part-1.bz2"));
        assert!(!g.matches("part-10.bz2"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let g = glob("a+b(1).json");
        assert!(g.matches("a+b(1).json"));
        assert!(!g.matches("aab1.json"));
        assert!(!glob("*.xml").matches("axml"));
    }

    #[test]
    fn character_classes() {
        let g = glob("RC_2015-0[1-3].bz2");
        assert!(g.matches("RC_2015-02.bz2"));
        assert!(!g.matches("RC_2015-04.bz2"));

        let g = glob("[!._]*");
        assert!(g.matches("data.xml"));
        assert!(!g.matches(".hidden"));
        assert!(!g.matches("_tmp"));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert!(matches!(
            GlobPattern::new("[abc"),
            Err(ConfigError::InvalidPattern { .. })
        ));
        assert!(GlobPattern::new("").is_err());
    }
}
