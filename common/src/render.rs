//! Placeholder rendering
//!
//! `{first name}` / `{{First Name}}` tokens are replaced with values from the
//! recipient row. Rendering never fails: unknown tokens become "".

use crate::options::PipelineOptions;
use crate::recipient::Recipient;
use crate::types::Row;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Bracket style of placeholder tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `{name}`
    #[default]
    Single,
    /// `{{Name}}`
    Double,
    /// Both; `{{x}}` is tried before `{x}` at each position
    Any,
}

impl PlaceholderStyle {
    fn pattern(self) -> &'static Regex {
        lazy_static::lazy_static! {
            static ref SINGLE_RE: Regex = Regex::new(r"\{([^{}]+)\}").unwrap();
            static ref DOUBLE_RE: Regex = Regex::new(r"\{\{([^{}]+)\}\}").unwrap();
            static ref ANY_RE: Regex = Regex::new(r"\{\{([^{}]+)\}\}|\{([^{}]+)\}").unwrap();
        }
        match self {
            PlaceholderStyle::Single => &SINGLE_RE,
            PlaceholderStyle::Double => &DOUBLE_RE,
            PlaceholderStyle::Any => &ANY_RE,
        }
    }

    /// Example token, for help output
    pub fn example(self) -> &'static str {
        match self {
            PlaceholderStyle::Single => "{first name}",
            PlaceholderStyle::Double => "{{First Name}}",
            PlaceholderStyle::Any => "{first name} or {{First Name}}",
        }
    }
}

impl std::str::FromStr for PlaceholderStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" | "{}" => Ok(PlaceholderStyle::Single),
            "double" | "{{}}" => Ok(PlaceholderStyle::Double),
            "any" | "both" => Ok(PlaceholderStyle::Any),
            _ => Err(format!("Unknown placeholder style: {}. Use single, double, or any", s)),
        }
    }
}

impl std::fmt::Display for PlaceholderStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceholderStyle::Single => write!(f, "single"),
            PlaceholderStyle::Double => write!(f, "double"),
            PlaceholderStyle::Any => write!(f, "any"),
        }
    }
}

/// Whether `text` contains at least one token of this style
pub fn has_placeholders(text: &str, style: PlaceholderStyle) -> bool {
    style.pattern().is_match(text)
}

/// Substitute every token in `text` using an already resolved recipient.
pub fn render(text: &str, recipient: &Recipient<'_>, style: PlaceholderStyle) -> String {
    if !text.contains('{') {
        return text.to_string();
    }
    style
        .pattern()
        .replace_all(text, |caps: &Captures| {
            let token = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            recipient.token_value(token)
        })
        .into_owned()
}

/// Substitute every token in `text` from `row`.
pub fn render_row(text: &str, row: &Row, options: &PipelineOptions) -> String {
    let recipient = Recipient::resolve(row, &options.aliases);
    render(text, &recipient, options.placeholder_style)
}

/// Plain rendered body → HTML body for the mail client.
///
/// Double spaces mark paragraph breaks, newlines become `<br>`.
pub fn html_body(text: &str) -> String {
    let escaped = text
        .trim()
        .replace("\r\n", "\n")
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    let mut html = escaped.replace("  ", "<br><br>").replace('\n', "<br>");

    while let Some(rest) = html.strip_prefix("<br>") {
        html = rest.to_string();
    }
    while let Some(rest) = html.strip_suffix("<br>") {
        html = rest.to_string();
    }

    format!(
        "<html><body style='margin:0;padding:0;font-family:Arial,sans-serif;'>{}</body></html>",
        html.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(style: PlaceholderStyle) -> PipelineOptions {
        PipelineOptions {
            placeholder_style: style,
            ..Default::default()
        }
    }

    #[test]
    fn test_alias_resolution() {
        let row = Row::from_pairs([("FirstName", "Ana"), ("Company", "Acme")]);
        let out = render_row("Hi {first name} from {firm}", &row, &opts(PlaceholderStyle::Single));
        assert_eq!(out, "Hi Ana from Acme");
    }

    #[test]
    fn test_missing_fields_render_empty() {
        let row = Row::from_pairs([("Email", "a@x.com")]);
        let out = render_row("Hi {first name} from {firm}", &row, &opts(PlaceholderStyle::Single));
        assert_eq!(out, "Hi  from ");
    }

    #[test]
    fn test_unknown_placeholder_is_removed_not_left_literal() {
        let row = Row::new();
        let out = render_row("A{nothing here}B", &row, &opts(PlaceholderStyle::Single));
        assert_eq!(out, "AB");
    }

    #[test]
    fn test_case_insensitive_headers() {
        let row = Row::from_pairs([("Deal Team", "M&A")]);
        let out = render_row("Team: {DEAL TEAM}", &row, &opts(PlaceholderStyle::Single));
        assert_eq!(out, "Team: M&A");
    }

    #[test]
    fn test_double_style() {
        let row = Row::from_pairs([("Name", "Ana Lopez")]);
        let o = opts(PlaceholderStyle::Double);
        assert_eq!(render_row("Hi {{First Name}}", &row, &o), "Hi Ana");
        // single braces are plain text in this style
        assert_eq!(render_row("Hi {first name}", &row, &o), "Hi {first name}");
    }

    #[test]
    fn test_any_style_handles_both() {
        let row = Row::from_pairs([("Name", "Ana Lopez"), ("School", "Duke")]);
        let out = render_row("{{first name}} / {school}", &row, &opts(PlaceholderStyle::Any));
        assert_eq!(out, "Ana / Duke");
    }

    #[test]
    fn test_text_without_braces_is_untouched() {
        let row = Row::new();
        let text = "No tokens at all";
        assert_eq!(render_row(text, &row, &PipelineOptions::default()), text);
    }

    #[test]
    fn test_has_placeholders() {
        assert!(has_placeholders("About {firm}", PlaceholderStyle::Single));
        assert!(!has_placeholders("Plain subject", PlaceholderStyle::Single));
        assert!(!has_placeholders("About {firm}", PlaceholderStyle::Double));
    }

    #[test]
    fn test_html_body() {
        let html = html_body("\nHi Ana,\nThanks  Best\n");
        assert_eq!(
            html,
            "<html><body style='margin:0;padding:0;font-family:Arial,sans-serif;'>Hi Ana,<br>Thanks<br><br>Best</body></html>"
        );
        assert!(html_body("a < b").contains("a &lt; b"));
    }

    #[test]
    fn test_style_from_str() {
        assert_eq!("double".parse::<PlaceholderStyle>(), Ok(PlaceholderStyle::Double));
        assert_eq!("{}".parse::<PlaceholderStyle>(), Ok(PlaceholderStyle::Single));
        assert!("angle".parse::<PlaceholderStyle>().is_err());
    }
}
