//! Shared data types
//!
//! - Row / Dataset: recipient data as loaded from a data source
//! - Template / TemplateId / Overrides: what a profile stores
//! - Assignment / PreviewRow: derived, never persisted

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// One recipient row: column name (case preserved) to value, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut row = Self::new();
        for (k, v) in pairs {
            row.insert(k, v);
        }
        row
    }

    /// Insert a cell, replacing an existing column with the exact same name.
    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        let header = header.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(h, _)| *h == header) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((header, value)),
        }
    }

    /// Exact-name lookup
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive lookup on trimmed header names.
    ///
    /// When several columns match, the first non-empty value wins;
    /// `Some("")` means the column exists but every match is blank.
    pub fn get_ci(&self, header: &str) -> Option<&str> {
        let wanted = header.trim().to_lowercase();
        let mut found: Option<&str> = None;
        for (h, v) in &self.cells {
            if h.trim().to_lowercase() != wanted {
                continue;
            }
            if !v.trim().is_empty() {
                return Some(v.as_str());
            }
            found.get_or_insert(v.as_str());
        }
        found
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (h, v) in &self.cells {
            map.serialize_entry(h, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of column names to string values")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Row, M::Error> {
                let mut row = Row::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    row.insert(k, v);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// Rows plus the header line they were read with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }
}

/// Opaque, stable template identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    /// Fresh random id (UUID v4)
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TemplateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Email body template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub text: String,
    /// Never picked by rotation; only reachable through an override.
    #[serde(default)]
    pub manual_only: bool,
}

impl Template {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: TemplateId::generate(),
            name: name.into(),
            text: text.into(),
            manual_only: false,
        }
    }

    pub fn manual(mut self) -> Self {
        self.manual_only = true;
        self
    }
}

/// Template text read from a file (name = file stem)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFile {
    pub name: String,
    pub content: String,
}

/// Normalized email → template id. Keys are always `normalize_email`'d.
pub type Overrides = BTreeMap<String, TemplateId>;

/// Canonical form used for override keys and identity.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Result of assigning a template to one eligible row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub template_id: Option<TemplateId>,
    pub template_name: String,
    /// True iff the assignment came from the override map.
    pub is_manual: bool,
}

impl Assignment {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(template: &Template, is_manual: bool) -> Self {
        Self {
            template_id: Some(template.id.clone()),
            template_name: template.name.clone(),
            is_manual,
        }
    }
}

/// Display projection of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRow {
    /// Position in the full row set
    pub row_index: usize,
    pub name: String,
    pub email: String,
    pub firm: String,
    pub template_name: String,
    pub template_id: Option<TemplateId>,
    pub is_manual: bool,
    pub is_eligible: bool,
}
