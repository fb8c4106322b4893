//! Template file reader
//!
//! Reads `.txt` (and `.html`, converted to plain text) files into
//! `TemplateFile`s for import. The file stem becomes the template name.

use crate::error::{DraftMateError, Result};
use draftmate_common::TemplateFile;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const TEMPLATE_EXTENSIONS: &[&str] = &["txt", "html", "htm"];

fn is_template_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TEMPLATE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "html" | "htm"))
        .unwrap_or(false)
}

/// Named and numeric character references, decoded in one pass so
/// `&amp;lt;` stays `&lt;`. Unknown names are left as written.
fn decode_entities(text: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENTITY_RE: Regex =
            Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").unwrap();
    }
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(|dec| dec.parse::<u32>()))
                    .and_then(|n| n.ok())
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// `<br>` → newline, style/script blocks and remaining tags removed,
/// character references decoded
pub fn html_to_text(html: &str) -> String {
    lazy_static::lazy_static! {
        static ref BR_RE: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
        static ref STYLE_RE: Regex = Regex::new(r"(?is)<style.*?>.*?</style>").unwrap();
        static ref SCRIPT_RE: Regex = Regex::new(r"(?is)<script.*?>.*?</script>").unwrap();
        static ref TAG_RE: Regex = Regex::new(r"(?s)<[^>]+>").unwrap();
    }
    let s = BR_RE.replace_all(html, "\n");
    let s = STYLE_RE.replace_all(&s, "");
    let s = SCRIPT_RE.replace_all(&s, "");
    let s = TAG_RE.replace_all(&s, "");
    decode_entities(&s).trim().to_string()
}

/// Read one template file. Trailing whitespace is trimmed.
pub fn read_template_file(path: &Path) -> Result<TemplateFile> {
    let raw = std::fs::read_to_string(path)?;
    let content = if is_html(path) {
        html_to_text(&raw)
    } else {
        raw.trim_end().to_string()
    };
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(TemplateFile { name, content })
}

/// Read every path in order; missing or unreadable files are skipped.
pub fn read_template_files(paths: &[PathBuf]) -> Vec<TemplateFile> {
    paths
        .iter()
        .filter_map(|path| match read_template_file(path) {
            Ok(file) => Some(file),
            Err(e) => {
                log::warn!("skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

/// Template files directly inside `folder`, sorted by file name
pub fn scan_template_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(DraftMateError::FileNotFound(folder.display().to_string()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_template_extension(p))
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_read_template_files_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let intro = dir.path().join("Intro.txt");
        fs::write(&intro, "Hi {first name},\n\nThanks!\n\n  ").unwrap();

        let files = read_template_files(&[intro, dir.path().join("missing.txt")]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "Intro");
        assert_eq!(files[0].content, "Hi {first name},\n\nThanks!");
    }

    #[test]
    fn test_scan_folder_sorted_txt_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.TXT"), "a").unwrap();
        fs::write(dir.path().join("notes.md"), "x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.txt"), "c").unwrap();

        let files = scan_template_folder(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.TXT", "b.txt"]);
    }

    #[test]
    fn test_scan_missing_folder() {
        assert!(scan_template_folder(Path::new("/nonexistent/templates")).is_err());
    }

    #[test]
    fn test_html_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("promo.html");
        fs::write(
            &path,
            "<html><style>p{color:red}</style><body><p>Hi {firm}<br/>Bye</p></body></html>",
        )
        .unwrap();
        let file = read_template_file(&path).unwrap();
        assert_eq!(file.name, "promo");
        assert_eq!(file.content, "Hi {firm}\nBye");
    }

    #[test]
    fn test_html_entities_decoded() {
        assert_eq!(
            html_to_text("<p>Smith &amp; Co &lt;M&amp;A&gt;<br>&quot;Q3&quot; &#39;24 &#x263A;</p>"),
            "Smith & Co <M&A>\n\"Q3\" '24 \u{263A}"
        );
        assert_eq!(html_to_text("&amp;lt; &copy; &#xD800;"), "&lt; &copy; &#xD800;");
    }
}
