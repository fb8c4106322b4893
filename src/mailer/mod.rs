//! Mail client automation

pub mod outlook;

use crate::error::Result;
use std::path::PathBuf;
use std::sync::Mutex;

pub use outlook::OutlookMailer;

/// One draft to create in the mail client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachment: Option<PathBuf>,
}

/// Creates drafts. One call is one draft, and the unit of partial failure.
#[async_trait::async_trait]
pub trait Mailer {
    async fn create_draft(&self, draft: &Draft) -> Result<()>;
}

/// Keeps drafts in memory instead of sending them anywhere
#[derive(Debug, Default)]
pub struct MemoryMailer {
    drafts: Mutex<Vec<Draft>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drafts(&self) -> Vec<Draft> {
        match self.drafts.lock() {
            Ok(d) => d.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait::async_trait]
impl Mailer for MemoryMailer {
    async fn create_draft(&self, draft: &Draft) -> Result<()> {
        match self.drafts.lock() {
            Ok(mut d) => d.push(draft.clone()),
            Err(poisoned) => poisoned.into_inner().push(draft.clone()),
        }
        Ok(())
    }
}
