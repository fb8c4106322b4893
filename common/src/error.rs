//! Error types

use thiserror::Error;

/// Shared error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Profile error: {0}")]
    Profile(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),
}

/// Result alias
pub type Result<T> = std::result::Result<T, Error>;
