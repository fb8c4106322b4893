use thiserror::Error;

#[derive(Error, Debug)]
pub enum DraftMateError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("No data source configured. Set one with `draftmate load --csv PATH` or `--sheet URL`")]
    MissingDataSource,

    #[error("No templates in profile \"{0}\". Add one with `draftmate template add`")]
    NoTemplates(String),

    #[error("No eligible recipients (rows need an email and must not be opted out via Generate)")]
    NoRecipients,

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to load data: {0}")]
    DataLoad(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid Google Sheets URL: {0}")]
    SheetUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("License invalid: {0}")]
    LicenseInvalid(String),

    #[error("Mail client error: {0}")]
    Mail(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Another preview or generation is already running")]
    Busy,

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Common(#[from] draftmate_common::Error),
}

impl From<dialoguer::Error> for DraftMateError {
    fn from(e: dialoguer::Error) -> Self {
        DraftMateError::Prompt(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DraftMateError>;
