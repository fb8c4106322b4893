//! Header alias table
//!
//! Recipient data comes from free-form spreadsheets, so semantic fields
//! (email, name, firm, ...) are located by trying an ordered list of
//! candidate header names, case-insensitively. The built-in table is static;
//! users can append their own candidates through `HeaderAliases`.

use crate::types::Row;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Semantic recipient fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Email,
    FullName,
    FirstName,
    LastName,
    Firm,
    School,
    Prefix,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Email,
        Field::FullName,
        Field::FirstName,
        Field::LastName,
        Field::Firm,
        Field::School,
        Field::Prefix,
    ];

    /// Built-in header candidates, in priority order.
    pub fn header_aliases(self) -> &'static [&'static str] {
        match self {
            Field::Email => &["email", "e-mail", "mail", "address", "email address"],
            Field::FullName => &["full name", "fullname", "full_name", "name", "contact"],
            Field::FirstName => &["first name", "firstname", "first_name", "first", "given name"],
            Field::LastName => &["last name", "lastname", "last_name", "last", "surname"],
            Field::Firm => &["firm", "company", "firm name", "company name", "business", "organization"],
            Field::School => &["school", "college", "university"],
            Field::Prefix => &["prefix", "salutation"],
        }
    }

    /// Placeholder tokens that address this field, lowercase.
    pub fn placeholder_tokens(self) -> &'static [&'static str] {
        match self {
            Field::Email => &["email", "e-mail"],
            Field::FullName => &["full name", "fullname", "name"],
            Field::FirstName => &["first name", "firstname", "first"],
            Field::LastName => &["last name", "lastname", "last"],
            Field::Firm => &["firm", "firm name", "company", "company name"],
            Field::School => &["school"],
            Field::Prefix => &["prefix"],
        }
    }

    /// Substring fallback used when no exact alias matched.
    /// Returns (must contain any of, must not contain any of).
    fn fallback_substrings(self) -> (&'static [&'static str], &'static [&'static str]) {
        match self {
            Field::Email => (&["email"], &[]),
            // "Firm Email" must not be picked up as the firm
            Field::Firm => (&["company", "firm"], &["email"]),
            Field::School => (&["school", "college", "university"], &[]),
            _ => (&[], &[]),
        }
    }

    /// Canonical field addressed by a placeholder token, if any.
    pub fn from_token(token: &str) -> Option<Field> {
        let key = token.trim().to_lowercase();
        Field::ALL
            .into_iter()
            .find(|f| f.placeholder_tokens().contains(&key.as_str()))
    }
}

impl std::str::FromStr for Field {
    type Err = String;

    /// Accepts `first_name` style names and any placeholder token.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('_', " ");
        Field::from_token(&key)
            .or_else(|| Field::from_token(&key.replace(' ', "")))
            .ok_or_else(|| {
                format!(
                    "Unknown field: {}. Use email, full_name, first_name, last_name, firm, school, or prefix",
                    s
                )
            })
    }
}

/// Built-in table plus user-supplied candidates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderAliases {
    /// Extra candidates, tried after the built-in ones.
    #[serde(default)]
    pub extra: HashMap<Field, Vec<String>>,
}

impl HeaderAliases {
    /// Add candidates from `other` (appended, duplicates skipped).
    pub fn merge(&mut self, other: &HeaderAliases) {
        for (field, names) in &other.extra {
            let entry = self.extra.entry(*field).or_default();
            for name in names {
                if !entry.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                    entry.push(name.clone());
                }
            }
        }
    }

    fn candidates(&self, field: Field) -> impl Iterator<Item = &str> {
        field
            .header_aliases()
            .iter()
            .copied()
            .chain(self.extra.get(&field).into_iter().flatten().map(|s| s.as_str()))
    }

    /// First non-empty value for `field`, trimmed. `None` when unresolved.
    pub fn lookup<'r>(&self, row: &'r Row, field: Field) -> Option<&'r str> {
        for candidate in self.candidates(field) {
            if let Some(value) = row.get_ci(candidate) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }

        let (include, exclude) = field.fallback_substrings();
        if include.is_empty() {
            return None;
        }
        row.iter()
            .filter(|(h, _)| {
                let h = h.to_lowercase();
                include.iter().any(|s| h.contains(s)) && !exclude.iter().any(|s| h.contains(s))
            })
            .map(|(_, v)| v.trim())
            .find(|v| !v.is_empty())
    }

    /// Like `lookup`, but unresolved fields come back as "".
    pub fn value(&self, row: &Row, field: Field) -> String {
        self.lookup(row, field).unwrap_or_default().to_string()
    }
}
