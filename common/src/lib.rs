//! DraftMate Common Library
//!
//! Shared types, profile editing and the pure assignment/rendering pipeline
//! used by both preview and draft generation.

pub mod alias;
pub mod assign;
pub mod eligibility;
pub mod error;
pub mod options;
pub mod plan;
pub mod preview;
pub mod profile;
pub mod recipient;
pub mod render;
pub mod types;

pub use alias::{Field, HeaderAliases};
pub use assign::{assign_all, Assigner, RotationScope};
pub use eligibility::{eligible_indices, is_eligible, looks_like_email};
pub use error::{Error, Result};
pub use options::PipelineOptions;
pub use plan::{plan_drafts, plan_warnings, DraftPlan, PlannedDraft};
pub use preview::{build_preview, PreviewStats};
pub use profile::{
    DataSourceConfig, DataSourceKind, Profile, ProfileBook, ProfileSnapshot, DEFAULT_SUBJECT,
};
pub use recipient::Recipient;
pub use render::{html_body, render, render_row, PlaceholderStyle};
pub use types::{
    normalize_email, Assignment, Dataset, Overrides, PreviewRow, Row, Template, TemplateFile,
    TemplateId,
};
