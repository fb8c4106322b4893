//! Local CSV files

use crate::error::{DraftMateError, Result};
use draftmate_common::{Dataset, Row};
use std::io::Read;
use std::path::Path;

/// Trimmed cell text, with non-breaking spaces turned into plain ones
pub(crate) fn clean_cell(cell: &str) -> String {
    cell.replace('\u{00A0}', " ").trim().to_string()
}

/// Build a dataset from a header line and raw records.
///
/// Short records are padded with "", extra cells beyond the header are
/// dropped, and records with no content at all are skipped.
pub(crate) fn build_dataset<I>(headers: Vec<String>, records: I) -> Dataset
where
    I: IntoIterator<Item = Vec<String>>,
{
    let rows = records
        .into_iter()
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .map(|cells| {
            let mut row = Row::new();
            for (i, header) in headers.iter().enumerate() {
                let value = cells.get(i).cloned().unwrap_or_default();
                row.insert(header.clone(), value);
            }
            row
        })
        .collect();
    Dataset::new(headers, rows)
}

/// Parse CSV text (header line first). A leading UTF-8 BOM is ignored.
pub fn parse_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .trim(::csv::Trim::None)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = clean_cell(h.trim_start_matches('\u{feff}'));
            if h.is_empty() {
                format!("Column {}", i + 1)
            } else {
                h
            }
        })
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(clean_cell).collect::<Vec<_>>());
    }

    Ok(build_dataset(headers, records))
}

pub fn parse_csv_str(text: &str) -> Result<Dataset> {
    parse_csv(text.as_bytes())
}

pub fn load_csv(path: &Path) -> Result<Dataset> {
    if !path.is_file() {
        return Err(DraftMateError::FileNotFound(path.display().to_string()));
    }
    let file = std::fs::File::open(path)?;
    let dataset = parse_csv(std::io::BufReader::new(file))?;
    log::info!("loaded {} row(s) from {}", dataset.count(), path.display());
    Ok(dataset)
}
