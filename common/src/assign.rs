//! Template assignment
//!
//! Each eligible row gets exactly one outcome:
//! - an override for its email wins (even for manual-only templates)
//! - otherwise the next template in round-robin over the non-manual-only ones
//! - otherwise nothing
//!
//! The rotation counter belongs to a single `Assigner`, i.e. to one pass.
//! It only advances on automatic assignments: override rows, including
//! overrides pointing at a deleted template, never take a rotation slot.

use crate::options::PipelineOptions;
use crate::recipient::Recipient;
use crate::types::{Assignment, Overrides, Row, Template};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What the rotation counter is keyed on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationScope {
    /// One counter for the whole pass
    #[default]
    Global,
    /// One counter per firm, so colleagues get different templates
    PerFirm,
}

impl std::str::FromStr for RotationScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" => Ok(RotationScope::Global),
            "per-firm" | "per_firm" | "firm" => Ok(RotationScope::PerFirm),
            _ => Err(format!("Unknown rotation scope: {}. Use global or per-firm", s)),
        }
    }
}

impl std::fmt::Display for RotationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationScope::Global => write!(f, "global"),
            RotationScope::PerFirm => write!(f, "per-firm"),
        }
    }
}

/// Stateful assigner for a single pass over eligible rows.
pub struct Assigner<'a> {
    templates: &'a [Template],
    overrides: &'a Overrides,
    rotatable: Vec<&'a Template>,
    scope: RotationScope,
    counters: HashMap<String, usize>,
}

impl<'a> Assigner<'a> {
    pub fn new(templates: &'a [Template], overrides: &'a Overrides, scope: RotationScope) -> Self {
        Self {
            templates,
            overrides,
            rotatable: templates.iter().filter(|t| !t.manual_only).collect(),
            scope,
            counters: HashMap::new(),
        }
    }

    fn template_by_id(&self, id: &crate::types::TemplateId) -> Option<&'a Template> {
        self.templates.iter().find(|t| &t.id == id)
    }

    /// Assign the next row of the pass.
    pub fn assign(&mut self, recipient: &Recipient<'_>) -> Assignment {
        let email = recipient.email_key();

        if !email.is_empty() {
            if let Some(id) = self.overrides.get(&email) {
                return match self.template_by_id(id) {
                    Some(t) => Assignment::of(t, true),
                    None => {
                        log::debug!("override for {} points at missing template {}", email, id);
                        Assignment::none()
                    }
                };
            }
        }

        if self.rotatable.is_empty() {
            return Assignment::none();
        }

        let key = match self.scope {
            RotationScope::Global => String::new(),
            RotationScope::PerFirm => recipient.firm().to_string(),
        };
        let slot = self.counters.entry(key).or_insert(0);
        let template = self.rotatable[*slot % self.rotatable.len()];
        *slot += 1;

        Assignment::of(template, false)
    }
}

/// Assign templates to rows that are already known to be eligible.
pub fn assign_all<'r, I>(
    rows: I,
    templates: &[Template],
    overrides: &Overrides,
    options: &PipelineOptions,
) -> Vec<Assignment>
where
    I: IntoIterator<Item = &'r Row>,
{
    let mut assigner = Assigner::new(templates, overrides, options.rotation);
    rows.into_iter()
        .map(|row| assigner.assign(&Recipient::resolve(row, &options.aliases)))
        .collect()
}
