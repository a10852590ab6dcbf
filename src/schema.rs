//! Backend-neutral index schema
//!
//! Each dump format supplies one `IndexSchema` through a `SchemaProvider`.
//! Backends translate it into their own field definitions when the index is
//! created.

use serde::{Deserialize, Serialize};

/// Index-wide options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOptions {
    /// Do not keep term frequencies
    pub no_frequencies: bool,
    /// Do not keep term offsets (disables highlighting and exact phrase slop)
    pub no_offset_vectors: bool,
    /// Do not retain original field values
    pub no_save: bool,
}

/// Type and options of a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text {
        sortable: bool,
        no_stem: bool,
        no_index: bool,
    },
    /// Comma separated list of exact-match tags
    Tag,
    Numeric {
        sortable: bool,
        no_index: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    #[must_use]
    pub fn text(name: &str) -> Self {
        Self::text_with(name, false, false, false)
    }

    #[must_use]
    pub fn text_with(name: &str, sortable: bool, no_stem: bool, no_index: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Text {
                sortable,
                no_stem,
                no_index,
            },
        }
    }

    #[must_use]
    pub fn tag(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Tag,
        }
    }

    #[must_use]
    pub fn numeric(name: &str) -> Self {
        Self::numeric_with(name, false, false)
    }

    #[must_use]
    pub fn numeric_with(name: &str, sortable: bool, no_index: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Numeric { sortable, no_index },
        }
    }

    #[must_use]
    pub fn is_indexed(&self) -> bool {
        match self.kind {
            FieldKind::Text { no_index, .. } | FieldKind::Numeric { no_index, .. } => !no_index,
            FieldKind::Tag => true,
        }
    }
}

/// Ordered field definitions plus index options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub options: SchemaOptions,
    pub fields: Vec<FieldSpec>,
}

impl IndexSchema {
    #[must_use]
    pub fn new(options: SchemaOptions) -> Self {
        Self {
            options,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of fields that take part in full-text search
    pub fn searchable_text_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(|f| match f.kind {
            FieldKind::Text { no_index: false, .. } => Some(f.name.as_str()),
            _ => None,
        })
    }
}

/// Supplies the schema of one dump format
pub trait SchemaProvider: Send + Sync {
    fn schema(&self) -> IndexSchema;
}

impl SchemaProvider for IndexSchema {
    fn schema(&self) -> IndexSchema {
        self.clone()
    }
}

impl<F> SchemaProvider for F
where
    F: Fn() -> IndexSchema + Send + Sync,
{
    fn schema(&self) -> IndexSchema {
        self()
    }
}
