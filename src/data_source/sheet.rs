//! Google Sheets (public link) via the CSV export endpoint

use super::csv::parse_csv_str;
use crate::error::{DraftMateError, Result};
use draftmate_common::Dataset;
use regex::Regex;

const SHEETS_HOST: &str = "docs.google.com";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36";

/// Sharing link → `https://docs.google.com/spreadsheets/d/<id>/export?format=csv&gid=<gid>`
///
/// The gid comes from the `#gid=` fragment or `gid=` query; default 0.
pub fn export_csv_url(url: &str) -> Result<String> {
    lazy_static::lazy_static! {
        static ref ID_RE: Regex = Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").unwrap();
        static ref GID_RE: Regex = Regex::new(r"[#?&]gid=(\d+)").unwrap();
    }

    let url = url.trim();
    if !url.contains(SHEETS_HOST) {
        return Err(DraftMateError::SheetUrl(url.to_string()));
    }
    let id = ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| DraftMateError::SheetUrl(url.to_string()))?;
    let gid = GID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or("0");

    Ok(format!(
        "https://{}/spreadsheets/d/{}/export?format=csv&gid={}",
        SHEETS_HOST, id, gid
    ))
}

/// GET `url` and return the body as text, BOM stripped.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("text/html"));
    if is_html {
        // private sheets answer with a sign-in page
        return Err(DraftMateError::DataLoad(
            "the sheet is not shared publicly (got an HTML page instead of CSV)".into(),
        ));
    }

    let text = response.text().await?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

pub async fn load_sheet(client: &reqwest::Client, url: &str) -> Result<Dataset> {
    let export_url = export_csv_url(url)?;
    log::debug!("fetching {}", export_url);
    let text = fetch_text(client, &export_url).await?;
    let dataset = parse_csv_str(&text)?;
    log::info!("loaded {} row(s) from Google Sheet", dataset.count());
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_url_from_edit_link() {
        let url = "https://docs.google.com/spreadsheets/d/1AbC-d_9/edit#gid=42";
        assert_eq!(
            export_csv_url(url).unwrap(),
            "https://docs.google.com/spreadsheets/d/1AbC-d_9/export?format=csv&gid=42"
        );
    }

    #[test]
    fn test_export_url_default_gid() {
        let url = "https://docs.google.com/spreadsheets/d/XYZ/edit?usp=sharing";
        assert!(export_csv_url(url).unwrap().ends_with("gid=0"));
    }

    #[test]
    fn test_export_url_query_gid() {
        let url = "https://docs.google.com/spreadsheets/d/XYZ/export?format=csv&gid=7";
        assert!(export_csv_url(url).unwrap().ends_with("/XYZ/export?format=csv&gid=7"));
    }

    #[test]
    fn test_rejects_other_hosts() {
        assert!(matches!(
            export_csv_url("https://example.com/spreadsheets/d/XYZ"),
            Err(DraftMateError::SheetUrl(_))
        ));
        assert!(export_csv_url("https://docs.google.com/document/d/XYZ").is_err());
    }
}
