//! Template ZIP archive

use crate::error::{DraftMateError, Result};
use draftmate_common::Template;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

pub const ARCHIVE_BASE_NAME: &str = "My Email Templates";
const MAX_NAME_LEN: usize = 60;

/// Template name → file-name-safe stem
pub fn safe_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || " -_.".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = replaced.trim().trim_matches('.').trim();
    if trimmed.is_empty() {
        return "template".to_string();
    }
    trimmed.chars().take(MAX_NAME_LEN).collect()
}

/// `01_<safe name>.txt`, numbered from 1 in list order
pub fn entry_name(index: usize, template: &Template) -> String {
    format!("{:02}_{}.txt", index + 1, safe_filename(&template.name))
}

/// First unused `My Email Templates.zip`, `My Email Templates (1).zip`, ... in `dir`
pub fn unique_archive_path(dir: &Path) -> PathBuf {
    let mut path = dir.join(format!("{}.zip", ARCHIVE_BASE_NAME));
    let mut counter = 1;
    while path.exists() {
        path = dir.join(format!("{} ({}).zip", ARCHIVE_BASE_NAME, counter));
        counter += 1;
    }
    path
}

/// Downloads folder when present, otherwise the working directory
pub fn default_export_dir() -> PathBuf {
    dirs::download_dir()
        .filter(|d| d.is_dir())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Write every template into a new archive in `dir`; returns its path.
pub fn export_templates_zip(templates: &[Template], dir: &Path) -> Result<PathBuf> {
    if templates.is_empty() {
        return Err(DraftMateError::Export("No templates to export.".into()));
    }
    std::fs::create_dir_all(dir)?;

    let path = unique_archive_path(dir);
    let file = std::fs::File::create(&path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (idx, template) in templates.iter().enumerate() {
        zip.start_file(entry_name(idx, template), options)?;
        zip.write_all(template.text.as_bytes())?;
    }
    zip.finish()?;

    log::info!("exported {} template(s) to {}", templates.len(), path.display());
    Ok(path)
}
