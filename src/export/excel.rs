//! Preview table → .xlsx

use crate::error::{DraftMateError, Result};
use draftmate_common::PreviewRow;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook};
use std::path::Path;

const COLUMNS: &[(&str, f64)] = &[
    ("Row", 6.0),
    ("Name", 28.0),
    ("Email", 32.0),
    ("Firm", 24.0),
    ("Template", 24.0),
    ("Manual", 8.0),
    ("Eligible", 9.0),
];

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

/// Build the workbook in memory
pub fn preview_workbook_bytes(rows: &[PreviewRow]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xAAAAAA));
    let skipped_format = Format::new().set_font_color(Color::RGB(0x999999));

    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Preview")
        .map_err(|e| DraftMateError::Export(format!("sheet name: {}", e)))?;

    for (col, (title, width)) in COLUMNS.iter().enumerate() {
        let col = col as u16;
        worksheet
            .write_string_with_format(0, col, *title, &header_format)
            .map_err(|e| DraftMateError::Export(format!("header: {}", e)))?;
        worksheet
            .set_column_width(col, *width)
            .map_err(|e| DraftMateError::Export(format!("column width: {}", e)))?;
    }

    for (i, r) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        let template = if r.is_eligible && r.template_name.is_empty() {
            "(none)"
        } else {
            r.template_name.as_str()
        };
        let cells = [
            (r.row_index + 1).to_string(),
            r.name.clone(),
            r.email.clone(),
            r.firm.clone(),
            template.to_string(),
            yes_no(r.is_manual).to_string(),
            yes_no(r.is_eligible).to_string(),
        ];
        for (col, value) in cells.iter().enumerate() {
            let result = if r.is_eligible {
                worksheet.write_string(row, col as u16, value)
            } else {
                worksheet.write_string_with_format(row, col as u16, value, &skipped_format)
            };
            result.map_err(|e| DraftMateError::Export(format!("cell: {}", e)))?;
        }
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| DraftMateError::Export(format!("freeze panes: {}", e)))?;

    workbook
        .save_to_buffer()
        .map_err(|e| DraftMateError::Export(format!("save: {}", e)))
}

pub fn export_preview_xlsx(rows: &[PreviewRow], path: &Path) -> Result<()> {
    let bytes = preview_workbook_bytes(rows)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Reader};
    use draftmate_common::TemplateId;

    fn sample() -> Vec<PreviewRow> {
        vec![
            PreviewRow {
                row_index: 0,
                name: "Ana Lopez".into(),
                email: "ana@acme.com".into(),
                firm: "Acme".into(),
                template_name: "Intro".into(),
                template_id: Some(TemplateId::from("t1")),
                is_manual: false,
                is_eligible: true,
            },
            PreviewRow {
                row_index: 1,
                name: "Bo".into(),
                email: String::new(),
                firm: String::new(),
                template_name: String::new(),
                template_id: None,
                is_manual: false,
                is_eligible: false,
            },
        ]
    }

    #[test]
    fn test_export_preview_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.xlsx");
        export_preview_xlsx(&sample(), &path).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range("Preview").unwrap();
        assert_eq!(range.height(), 3);
        assert_eq!(range.get_value((0, 2)).unwrap().to_string(), "Email");
        assert_eq!(range.get_value((1, 4)).unwrap().to_string(), "Intro");
        assert_eq!(range.get_value((2, 6)).unwrap().to_string(), "No");
    }
}
