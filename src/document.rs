//! Uniform document representation produced by every reader

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a single document field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl FieldValue {
    /// Estimated wire size: string length, or 8 bytes for numbers
    #[inline]
    #[must_use]
    pub fn estimate_size(&self) -> usize {
        match self {
            FieldValue::Text(s) => s.len(),
            FieldValue::Integer(_) | FieldValue::Float(_) => 8,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// Indexable unit: identifier, default score and ordered fields
///
/// Field order is insertion order; setting an existing field replaces its
/// value in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub score: f32,
    fields: Vec<(String, FieldValue)>,
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
            fields: Vec::new(),
        }
    }

    /// Set a field, builder style
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    #[inline]
    #[must_use]
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Rough payload size used for data-rate metrics
    #[must_use]
    pub fn estimate_size(&self) -> usize {
        self.id.len()
            + self
                .fields
                .iter()
                .map(|(name, value)| name.len() + value.estimate_size())
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_existing_field_in_place() {
        let doc = Document::new("a", 1.0)
            .set("title", "first")
            .set("date", 10i64)
            .set("title", "second");

        let names: Vec<&str> = doc.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["title", "date"]);
        assert_eq!(doc.get("title").and_then(FieldValue::as_str), Some("second"));
    }

    #[test]
    fn estimate_counts_strings_and_fixed_numbers() {
        let doc = Document::new("id1", 1.0).set("body", "hello").set("n", 3i64);
        // "id1" + "body" + "hello" + "n" + 8
        assert_eq!(doc.estimate_size(), 3 + 4 + 5 + 1 + 8);
    }
}
