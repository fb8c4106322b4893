//! Recipient data sources
//!
//! - CSV file
//! - Google Sheets sharing link (fetched as CSV)
//! - .xlsx / .xls / .ods file

pub mod csv;
pub mod excel;
pub mod sheet;

use crate::error::{DraftMateError, Result};
use draftmate_common::{DataSourceConfig, DataSourceKind, Dataset};
use std::path::Path;
use std::time::Duration;

/// Anything that can turn a profile's data source settings into rows
#[async_trait::async_trait]
pub trait DataSource {
    async fn load(&self, config: &DataSourceConfig) -> Result<Dataset>;
}

/// Loads from the real file system / network
#[derive(Debug, Clone)]
pub struct SourceLoader {
    client: reqwest::Client,
}

impl SourceLoader {
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(1)))
            .build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait::async_trait]
impl DataSource for SourceLoader {
    async fn load(&self, config: &DataSourceConfig) -> Result<Dataset> {
        if !config.is_configured() {
            return Err(DraftMateError::MissingDataSource);
        }
        let location = config.location();
        match config.kind {
            DataSourceKind::Csv => self::csv::load_csv(Path::new(location)),
            DataSourceKind::Excel => excel::load_excel(Path::new(location)),
            DataSourceKind::Sheet => sheet::load_sheet(&self.client, location).await,
        }
    }
}

/// Guess the kind from a path or URL given on the command line
pub fn detect_kind(location: &str) -> DataSourceKind {
    let lower = location.trim().to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return DataSourceKind::Sheet;
    }
    match Path::new(&lower).extension().and_then(|e| e.to_str()) {
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => DataSourceKind::Excel,
        _ => DataSourceKind::Csv,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kind() {
        assert_eq!(detect_kind("https://docs.google.com/spreadsheets/d/x"), DataSourceKind::Sheet);
        assert_eq!(detect_kind("book.XLSX"), DataSourceKind::Excel);
        assert_eq!(detect_kind("contacts.csv"), DataSourceKind::Csv);
        assert_eq!(detect_kind("contacts"), DataSourceKind::Csv);
    }

    #[tokio::test]
    async fn test_unconfigured_source_is_rejected() {
        let loader = SourceLoader::new(5).unwrap();
        let err = loader.load(&DataSourceConfig::default()).await.unwrap_err();
        assert!(matches!(err, DraftMateError::MissingDataSource));
    }

    #[tokio::test]
    async fn test_loads_csv_through_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.csv");
        std::fs::write(&path, "Email\na@x.com\n").unwrap();

        let mut config = DataSourceConfig::default();
        config.set(DataSourceKind::Csv, path.display().to_string());
        let ds = SourceLoader::new(5).unwrap().load(&config).await.unwrap();
        assert_eq!(ds.count(), 1);
    }
}
