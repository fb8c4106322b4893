//! Per-row recipient view
//!
//! Resolves the semantic fields of one row once (via the alias table) and
//! derives the values placeholders refer to.
//!
//! Resolution priority for a placeholder token:
//! 1. Derived values (first name, last name, full name, firm, school, email, prefix)
//! 2. Exact header match (case-insensitive)
//! 3. Empty string

use crate::alias::{Field, HeaderAliases};
use crate::types::{normalize_email, Row};

/// Split a full name into (first, last).
///
/// "Last, First" and "First Middle Last" are both understood; a single word
/// is treated as the first name.
pub fn parse_name(full_name: &str) -> (String, String) {
    let full_name = full_name.trim();
    if full_name.is_empty() {
        return (String::new(), String::new());
    }

    if let Some((last, first)) = full_name.split_once(',') {
        return (first.trim().to_string(), last.trim().to_string());
    }

    let parts: Vec<&str> = full_name.split_whitespace().collect();
    match parts.as_slice() {
        [only] => (only.to_string(), String::new()),
        [first, .., last] => (first.to_string(), last.to_string()),
        [] => (String::new(), String::new()),
    }
}

/// Resolved fields of one row
#[derive(Debug, Clone)]
pub struct Recipient<'a> {
    row: &'a Row,
    email: String,
    first_name: String,
    last_name: String,
    full_name: String,
    firm: String,
    school: String,
    prefix: String,
}

impl<'a> Recipient<'a> {
    pub fn resolve(row: &'a Row, aliases: &HeaderAliases) -> Self {
        let full_name = aliases.value(row, Field::FullName);
        let (parsed_first, parsed_last) = parse_name(&full_name);

        let mut first_name = aliases.value(row, Field::FirstName);
        if first_name.is_empty() {
            first_name = parsed_first;
        }
        let mut last_name = aliases.value(row, Field::LastName);
        if last_name.is_empty() {
            last_name = parsed_last;
        }

        let full_name = if full_name.is_empty() {
            format!("{} {}", first_name, last_name).trim().to_string()
        } else {
            full_name
        };

        // "Dr" + "Smith" addresses the recipient as "Dr. Smith"
        let prefix = aliases.value(row, Field::Prefix);
        if !prefix.is_empty() {
            let bare = prefix.trim_end_matches('.');
            first_name = if last_name.is_empty() {
                format!("{}.", bare)
            } else {
                format!("{}. {}", bare, last_name)
            };
        }

        Self {
            row,
            email: aliases.value(row, Field::Email),
            first_name,
            last_name,
            full_name,
            firm: aliases.value(row, Field::Firm),
            school: aliases.value(row, Field::School),
            prefix,
        }
    }

    /// Email as written in the data (trimmed)
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Lowercased, trimmed email: the override key
    pub fn email_key(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn firm(&self) -> &str {
        &self.firm
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Name shown in previews
    pub fn display_name(&self) -> String {
        if !self.prefix.is_empty() && !self.full_name.is_empty() {
            return format!("{} ({})", self.first_name, self.full_name);
        }
        if self.prefix.is_empty() {
            format!("{} {}", self.first_name, self.last_name)
                .trim()
                .to_string()
        } else {
            self.first_name.clone()
        }
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Email => &self.email,
            Field::FullName => &self.full_name,
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::Firm => &self.firm,
            Field::School => &self.school,
            Field::Prefix => &self.prefix,
        }
    }

    /// Value for a placeholder token; unresolved tokens give "".
    pub fn token_value(&self, token: &str) -> String {
        if let Some(field) = Field::from_token(token) {
            return self.field(field).to_string();
        }
        self.row
            .get_ci(token)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }
}
