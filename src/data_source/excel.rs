//! Spreadsheet files (.xlsx / .xls / .ods), first worksheet only

use super::csv::{build_dataset, clean_cell};
use crate::error::{DraftMateError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use draftmate_common::Dataset;
use std::path::Path;

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => clean_cell(&other.to_string()),
    }
}

pub fn load_excel(path: &Path) -> Result<Dataset> {
    if !path.is_file() {
        return Err(DraftMateError::FileNotFound(path.display().to_string()));
    }

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| DraftMateError::DataLoad(format!("{}: {}", path.display(), e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DraftMateError::DataLoad(format!("{}: workbook has no sheets", path.display())))?
        .map_err(|e| DraftMateError::DataLoad(format!("{}: {}", path.display(), e)))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell_text(cell) {
                h if h.is_empty() => format!("Column {}", i + 1),
                h => h,
            })
            .collect(),
        None => return Ok(Dataset::default()),
    };

    let records = rows.map(|r| r.iter().map(cell_text).collect::<Vec<_>>());
    let dataset = build_dataset(headers, records);
    log::info!("loaded {} row(s) from {}", dataset.count(), path.display());
    Ok(dataset)
}
