//! Preview builder
//!
//! Eligible rows are pulled out with their original positions and run through
//! a single assignment pass; ineligible rows never reach the assigner and so
//! never take a rotation slot. With `only_recipients = false` the results are
//! scattered back into a full-length list in original row order.

use crate::assign::Assigner;
use crate::eligibility::eligible_indices;
use crate::options::PipelineOptions;
use crate::recipient::Recipient;
use crate::types::{Assignment, Overrides, PreviewRow, Row, Template};
use serde::Serialize;

/// One eligible row together with its assignment.
#[derive(Debug, Clone)]
pub struct AssignedRow<'a> {
    pub row_index: usize,
    pub row: &'a Row,
    pub assignment: Assignment,
}

/// Run eligibility + assignment once. Shared by preview and draft planning.
pub fn assign_eligible<'a>(
    rows: &'a [Row],
    templates: &[Template],
    overrides: &Overrides,
    options: &PipelineOptions,
) -> Vec<AssignedRow<'a>> {
    let mut assigner = Assigner::new(templates, overrides, options.rotation);
    eligible_indices(rows, &options.aliases)
        .into_iter()
        .map(|row_index| {
            let row = &rows[row_index];
            let recipient = Recipient::resolve(row, &options.aliases);
            AssignedRow {
                row_index,
                row,
                assignment: assigner.assign(&recipient),
            }
        })
        .collect()
}

fn preview_row(
    row_index: usize,
    row: &Row,
    assignment: Assignment,
    is_eligible: bool,
    options: &PipelineOptions,
) -> PreviewRow {
    let recipient = Recipient::resolve(row, &options.aliases);
    PreviewRow {
        row_index,
        name: recipient.display_name(),
        email: recipient.email().to_string(),
        firm: recipient.firm().to_string(),
        template_name: assignment.template_name,
        template_id: assignment.template_id,
        is_manual: assignment.is_manual,
        is_eligible,
    }
}

/// Build the preview.
///
/// - `only_recipients = true`: eligible rows only, in processing order
/// - `only_recipients = false`: one entry per input row; ineligible entries
///   carry no template
pub fn build_preview(
    rows: &[Row],
    templates: &[Template],
    overrides: &Overrides,
    only_recipients: bool,
    options: &PipelineOptions,
) -> Vec<PreviewRow> {
    let assigned = assign_eligible(rows, templates, overrides, options);

    if only_recipients {
        return assigned
            .into_iter()
            .map(|a| preview_row(a.row_index, a.row, a.assignment, true, options))
            .collect();
    }

    let mut slots: Vec<Option<Assignment>> = vec![None; rows.len()];
    for a in assigned {
        slots[a.row_index] = Some(a.assignment);
    }

    rows.iter()
        .zip(slots)
        .enumerate()
        .map(|(i, (row, slot))| match slot {
            Some(assignment) => preview_row(i, row, assignment, true, options),
            None => preview_row(i, row, Assignment::none(), false, options),
        })
        .collect()
}

/// Counts shown under the preview table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewStats {
    pub total: usize,
    pub eligible: usize,
    pub assigned: usize,
    pub manual: usize,
    pub unassigned: usize,
}

impl PreviewStats {
    pub fn from_rows(rows: &[PreviewRow]) -> Self {
        let mut stats = Self {
            total: rows.len(),
            ..Default::default()
        };
        for r in rows.iter().filter(|r| r.is_eligible) {
            stats.eligible += 1;
            if r.template_id.is_some() {
                stats.assigned += 1;
                if r.is_manual {
                    stats.manual += 1;
                }
            } else {
                stats.unassigned += 1;
            }
        }
        stats
    }
}
