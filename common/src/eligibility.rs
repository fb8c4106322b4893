//! Row eligibility
//!
//! A row takes part in template rotation when it has an email and has not
//! been opted out through a `Generate` column.

use crate::alias::{Field, HeaderAliases};
use crate::types::Row;

/// Name of the per-row opt-out column (compared lowercased, trimmed)
pub const GENERATE_COLUMN: &str = "generate";

/// Values of the generate column that opt a row out (case-insensitive)
pub const FALSY_TOKENS: &[&str] = &["false", "0", "no", ""];

/// Whether a generate-column value opts the row out
pub fn is_falsy(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    FALSY_TOKENS.contains(&v.as_str())
}

/// Whether the row's generate column (if any) allows generation.
pub fn generate_allowed(row: &Row) -> bool {
    match row.get_ci(GENERATE_COLUMN) {
        Some(value) => !is_falsy(value),
        None => true,
    }
}

/// A row is eligible iff it has a non-empty email and is not opted out.
pub fn is_eligible(row: &Row, aliases: &HeaderAliases) -> bool {
    aliases.lookup(row, Field::Email).is_some() && generate_allowed(row)
}

/// Indices of eligible rows, in original order.
pub fn eligible_indices(rows: &[Row], aliases: &HeaderAliases) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| is_eligible(row, aliases))
        .map(|(i, _)| i)
        .collect()
}

/// Loose address check used for warnings only; eligibility does not depend on it.
pub fn looks_like_email(email: &str) -> bool {
    lazy_static::lazy_static! {
        static ref EMAIL_RE: regex::Regex =
            regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eligible(pairs: &[(&str, &str)]) -> bool {
        let row = Row::from_pairs(pairs.iter().copied());
        is_eligible(&row, &HeaderAliases::default())
    }

    #[test]
    fn test_email_required() {
        assert!(eligible(&[("email", "a@x.com")]));
        assert!(!eligible(&[("email", "")]));
        assert!(!eligible(&[("email", "   ")]));
        assert!(!eligible(&[("name", "Ana")]));
    }

    #[test]
    fn test_falsy_generate_values_opt_out() {
        for v in ["false", "FALSE", "0", "no", "No", "", "  "] {
            assert!(!eligible(&[("email", "a@x.com"), ("Generate", v)]), "{:?}", v);
        }
    }

    #[test]
    fn test_other_generate_values_keep_row() {
        for v in ["yes", "TRUE", "1", "y", "maybe"] {
            assert!(eligible(&[("email", "a@x.com"), ("GENERATE", v)]), "{:?}", v);
        }
    }

    #[test]
    fn test_generate_column_name_must_match_exactly() {
        // "generated" is not the opt-out column
        assert!(eligible(&[("email", "a@x.com"), ("generated", "no")]));
    }

    #[test]
    fn test_eligible_indices_keep_order() {
        let rows = vec![
            Row::from_pairs([("email", "a@x.com")]),
            Row::from_pairs([("email", ""), ("generate", "no")]),
            Row::from_pairs([("email", "b@x.com"), ("generate", "yes")]),
        ];
        assert_eq!(eligible_indices(&rows, &HeaderAliases::default()), vec![0, 2]);
    }

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("a@x.com"));
        assert!(!looks_like_email("a@x"));
        assert!(!looks_like_email("not an email"));
    }
}
