//! Draft generation
//!
//! 1. License re-check, always online
//! 2. Input checks: data source, templates, attachment
//! 3. Fresh data load, so a stale preview never drives generation
//! 4. Plan (same pass as preview), warnings, then one mail-client call per draft
//!
//! A failing draft is recorded and the run continues.

use crate::data_source::DataSource;
use crate::error::{DraftMateError, Result};
use crate::license::{ensure_licensed, LicenseValidator};
use crate::mailer::{Draft, Mailer};
use crate::store::Store;
use chrono::Utc;
use draftmate_common::{
    html_body, plan_drafts, plan_warnings, DraftPlan, PipelineOptions, ProfileSnapshot,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;

/// How license checks are done for this run
#[derive(Debug, Clone, Default)]
pub struct LicensePolicy {
    /// `false` skips the check entirely
    pub required: bool,
    /// Key from the environment, used instead of the stored one
    pub key_override: Option<String>,
    /// Freshness window for status checks; generation ignores it
    pub recheck_minutes: i64,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Count drafts without calling the mail client
    pub dry_run: bool,
    pub show_progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftFailure {
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub eligible: usize,
    pub created: usize,
    /// Eligible recipients with no assigned template
    pub skipped: Vec<String>,
    pub failures: Vec<DraftFailure>,
    /// Pre-run warnings (placeholder-free subject, odd addresses)
    pub warnings: Vec<String>,
    pub dry_run: bool,
}

impl GenerationReport {
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reject absent inputs before touching the data source
pub fn check_inputs(snapshot: &ProfileSnapshot) -> Result<Option<PathBuf>> {
    if !snapshot.data_source.is_configured() {
        return Err(DraftMateError::MissingDataSource);
    }
    if snapshot.templates.is_empty() {
        return Err(DraftMateError::NoTemplates(snapshot.name.clone()));
    }
    match snapshot.attachment() {
        Some(path) if !path.is_file() => {
            Err(DraftMateError::FileNotFound(path.display().to_string()))
        }
        Some(path) => Ok(Some(path.to_path_buf())),
        None => Ok(None),
    }
}

/// Reload rows and plan every draft for `snapshot`.
pub async fn prepare<S: DataSource>(
    snapshot: &ProfileSnapshot,
    source: &S,
    options: &PipelineOptions,
) -> Result<DraftPlan> {
    let dataset = source.load(&snapshot.data_source).await?;
    let plan = plan_drafts(
        &dataset.rows,
        &snapshot.templates,
        &snapshot.overrides,
        &snapshot.subject_template,
        options,
    );
    if plan.eligible() == 0 {
        return Err(DraftMateError::NoRecipients);
    }
    Ok(plan)
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Hand every planned draft to the mailer and collect the report.
pub async fn send_plan<M: Mailer>(
    plan: &DraftPlan,
    attachment: Option<PathBuf>,
    mailer: &M,
    opts: &GenerateOptions,
) -> GenerationReport {
    let mut report = GenerationReport {
        eligible: plan.eligible(),
        skipped: plan.unassigned.clone(),
        dry_run: opts.dry_run,
        ..Default::default()
    };

    let pb = progress_bar(plan.drafts.len(), opts.show_progress && !opts.dry_run);
    for planned in &plan.drafts {
        if opts.dry_run {
            report.created += 1;
            continue;
        }

        pb.set_message(planned.to.clone());
        let draft = Draft {
            to: planned.to.clone(),
            subject: planned.subject.clone(),
            html_body: html_body(&planned.body),
            attachment: attachment.clone(),
        };
        match mailer.create_draft(&draft).await {
            Ok(()) => report.created += 1,
            Err(e) => {
                log::warn!("draft for {} failed: {}", planned.to, e);
                report.failures.push(DraftFailure {
                    email: planned.to.clone(),
                    message: e.to_string(),
                });
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    report
}

/// Full generation run for one profile snapshot.
#[allow(clippy::too_many_arguments)]
pub async fn generate<S, V, M>(
    snapshot: &ProfileSnapshot,
    source: &S,
    validator: &V,
    mailer: &M,
    store: &Store,
    license: &LicensePolicy,
    options: &PipelineOptions,
    opts: &GenerateOptions,
) -> Result<GenerationReport>
where
    S: DataSource,
    V: LicenseValidator,
    M: Mailer,
{
    if license.required {
        ensure_licensed(
            validator,
            store,
            license.key_override.as_deref(),
            0,
            true,
            Utc::now(),
        )
        .await?;
    }

    let attachment = check_inputs(snapshot)?;
    let plan = prepare(snapshot, source, options).await?;
    log::info!(
        "generating {} draft(s) for profile {} ({} without template)",
        plan.drafts.len(),
        snapshot.name,
        plan.unassigned.len()
    );

    let warnings = plan_warnings(&plan, &snapshot.subject_template, options.placeholder_style);
    for warning in &warnings {
        log::warn!("{}", warning);
    }

    let mut report = send_plan(&plan, attachment, mailer, opts).await;
    report.warnings = warnings;
    Ok(report)
}
