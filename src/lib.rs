//! DraftMate: personalized email drafts from a recipient spreadsheet and a
//! rotating set of templates.

pub mod cli;
pub mod config;
pub mod data_source;
pub mod error;
pub mod export;
pub mod generator;
pub mod license;
pub mod mailer;
pub mod scanner;
pub mod session;
pub mod store;
