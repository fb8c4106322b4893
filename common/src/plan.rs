//! Draft planning
//!
//! Pure half of generation: the same eligibility + assignment pass the
//! preview uses, followed by rendering of subject and body. Nothing here
//! talks to a mail client.

use crate::eligibility::looks_like_email;
use crate::options::PipelineOptions;
use crate::preview::assign_eligible;
use crate::recipient::Recipient;
use crate::render::{has_placeholders, render, PlaceholderStyle};
use crate::types::{Overrides, Row, Template, TemplateId};
use serde::Serialize;

/// One draft ready to hand to the mailer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedDraft {
    pub row_index: usize,
    pub to: String,
    pub subject: String,
    /// Rendered plain text; converted with `render::html_body` at send time
    pub body: String,
    pub template_id: TemplateId,
    pub template_name: String,
    pub is_manual: bool,
}

/// Planned drafts plus the eligible recipients that ended up without a template
#[derive(Debug, Clone, Default, Serialize)]
pub struct DraftPlan {
    pub drafts: Vec<PlannedDraft>,
    /// Emails of eligible rows with no assigned template
    pub unassigned: Vec<String>,
}

impl DraftPlan {
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Eligible rows seen by the pass
    pub fn eligible(&self) -> usize {
        self.drafts.len() + self.unassigned.len()
    }
}

/// Render every eligible, assigned row.
pub fn plan_drafts(
    rows: &[Row],
    templates: &[Template],
    overrides: &Overrides,
    subject: &str,
    options: &PipelineOptions,
) -> DraftPlan {
    let mut plan = DraftPlan::default();

    for assigned in assign_eligible(rows, templates, overrides, options) {
        let recipient = Recipient::resolve(assigned.row, &options.aliases);
        let template = assigned
            .assignment
            .template_id
            .as_ref()
            .and_then(|id| templates.iter().find(|t| &t.id == id));

        let Some(template) = template else {
            plan.unassigned.push(recipient.email().to_string());
            continue;
        };

        plan.drafts.push(PlannedDraft {
            row_index: assigned.row_index,
            to: recipient.email().to_string(),
            subject: render(subject, &recipient, options.placeholder_style),
            body: render(&template.text, &recipient, options.placeholder_style),
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            is_manual: assigned.assignment.is_manual,
        });
    }

    plan
}

/// Things worth flagging before drafts are created. None of them stop a run.
pub fn plan_warnings(plan: &DraftPlan, subject: &str, style: PlaceholderStyle) -> Vec<String> {
    let mut warnings = Vec::new();
    if !subject.trim().is_empty() && !has_placeholders(subject, style) {
        warnings.push(format!(
            "Subject template has no placeholders; every draft gets \"{}\"",
            subject.trim()
        ));
    }
    for draft in plan.drafts.iter().filter(|d| !looks_like_email(&d.to)) {
        warnings.push(format!("Invalid email address: {}", draft.to));
    }
    warnings
}
