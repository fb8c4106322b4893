pub mod archive;
pub mod excel;

pub use archive::{default_export_dir, export_templates_zip};
pub use excel::export_preview_xlsx;

use std::path::{Path, PathBuf};

/// `output` as a file path; a directory (or extension-less path) gets `default_name`
pub fn output_path_for(output: &Path, default_name: &str, extension: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.{}", default_name, extension))
    } else {
        output.to_path_buf()
    }
}
