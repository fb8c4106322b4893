//! Profiles
//!
//! A profile bundles a data source, a subject line, an optional attachment,
//! the ordered template list and the per-recipient override map. The
//! `ProfileBook` holds every profile in display order and tracks which one is
//! active.

use crate::error::{Error, Result};
use crate::types::{normalize_email, Overrides, Template, TemplateFile, TemplateId};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROFILE_NAME: &str = "Default";
pub const DEFAULT_SUBJECT: &str = "Interested in opportunities at {firm}";
pub const MAX_PROFILE_NAME_LEN: usize = 64;

/// Profile names are unique and matched ignoring surrounding space and case.
fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Where recipient rows come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    Csv,
    #[default]
    Sheet,
    Excel,
}

impl std::str::FromStr for DataSourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(DataSourceKind::Csv),
            "sheet" | "gsheet" | "google" => Ok(DataSourceKind::Sheet),
            "excel" | "xlsx" => Ok(DataSourceKind::Excel),
            _ => Err(format!("Unknown data source: {}. Use csv, sheet, or excel", s)),
        }
    }
}

impl std::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSourceKind::Csv => write!(f, "csv"),
            DataSourceKind::Sheet => write!(f, "sheet"),
            DataSourceKind::Excel => write!(f, "excel"),
        }
    }
}

/// Data source settings. Every location is kept so switching kinds loses nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    #[serde(default)]
    pub kind: DataSourceKind,
    #[serde(default)]
    pub csv_path: String,
    #[serde(default)]
    pub sheet_url: String,
    #[serde(default)]
    pub excel_path: String,
}

impl DataSourceConfig {
    /// Path or URL for the selected kind, trimmed
    pub fn location(&self) -> &str {
        match self.kind {
            DataSourceKind::Csv => self.csv_path.trim(),
            DataSourceKind::Sheet => self.sheet_url.trim(),
            DataSourceKind::Excel => self.excel_path.trim(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.location().is_empty()
    }

    /// Select `kind` and set its location
    pub fn set(&mut self, kind: DataSourceKind, location: impl Into<String>) {
        self.kind = kind;
        let location = location.into();
        match kind {
            DataSourceKind::Csv => self.csv_path = location,
            DataSourceKind::Sheet => self.sheet_url = location,
            DataSourceKind::Excel => self.excel_path = location,
        }
    }
}

/// Stored template shapes: older files may hold bare strings or omit id/name.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTemplate {
    Full {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        manual_only: bool,
    },
    Text(String),
}

fn migrate_templates<'de, D>(deserializer: D) -> std::result::Result<Vec<Template>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<StoredTemplate>> = Option::deserialize(deserializer)?;
    let templates = raw
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, stored)| match stored {
            StoredTemplate::Full {
                id,
                name,
                text,
                manual_only,
            } => Template {
                id: id
                    .filter(|id| !id.trim().is_empty())
                    .map(TemplateId::from)
                    .unwrap_or_else(TemplateId::generate),
                name: name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| format!("Template {}", i + 1)),
                text: text.unwrap_or_default(),
                manual_only,
            },
            StoredTemplate::Text(text) => Template {
                id: TemplateId::generate(),
                name: format!("Template {}", i + 1),
                text,
                manual_only: false,
            },
        })
        .collect();
    Ok(templates)
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

/// One named configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub data_source: DataSourceConfig,
    #[serde(default = "default_subject")]
    pub subject_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_path: Option<PathBuf>,
    #[serde(default, deserialize_with = "migrate_templates")]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub overrides: Overrides,
}

/// By-value copy of the active profile taken at the start of a pass
pub type ProfileSnapshot = Profile;

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_source: DataSourceConfig::default(),
            subject_template: default_subject(),
            attachment_path: None,
            templates: Vec::new(),
            overrides: Overrides::new(),
        }
    }

    /// Attachment, ignoring blank paths
    pub fn attachment(&self) -> Option<&Path> {
        self.attachment_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn template(&self, id: &TemplateId) -> Option<&Template> {
        self.templates.iter().find(|t| &t.id == id)
    }

    fn index_of(&self, id: &TemplateId) -> Result<usize> {
        self.templates
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| Error::TemplateNotFound(id.to_string()))
    }

    fn template_mut(&mut self, id: &TemplateId) -> Result<&mut Template> {
        let idx = self.index_of(id)?;
        Ok(&mut self.templates[idx])
    }

    /// Find a template by id, 1-based position, or name (case-insensitive).
    pub fn find_template(&self, key: &str) -> Option<&Template> {
        let key = key.trim();
        if let Some(t) = self.templates.iter().find(|t| t.id.as_str() == key) {
            return Some(t);
        }
        if let Ok(n) = key.parse::<usize>() {
            if n >= 1 && n <= self.templates.len() {
                return Some(&self.templates[n - 1]);
            }
        }
        self.templates
            .iter()
            .find(|t| t.name.trim().eq_ignore_ascii_case(key))
    }

    /// Append a template; a blank name becomes `Untitled N`.
    pub fn add_template(&mut self, name: &str, text: &str) -> &Template {
        let name = match name.trim() {
            "" => format!("Untitled {}", self.templates.len() + 1),
            n => n.to_string(),
        };
        self.templates.push(Template::new(name, text));
        let last = self.templates.len() - 1;
        &self.templates[last]
    }

    pub fn rename_template(&mut self, id: &TemplateId, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Profile("Template name is required.".to_string()));
        }
        self.template_mut(id)?.name = name.to_string();
        Ok(())
    }

    pub fn set_template_text(&mut self, id: &TemplateId, text: &str) -> Result<()> {
        self.template_mut(id)?.text = text.to_string();
        Ok(())
    }

    pub fn set_manual_only(&mut self, id: &TemplateId, manual_only: bool) -> Result<()> {
        self.template_mut(id)?.manual_only = manual_only;
        Ok(())
    }

    /// Move one position towards the front. `Ok(false)` when already first.
    pub fn move_up(&mut self, id: &TemplateId) -> Result<bool> {
        let idx = self.index_of(id)?;
        if idx == 0 {
            return Ok(false);
        }
        self.templates.swap(idx, idx - 1);
        Ok(true)
    }

    /// Move one position towards the back. `Ok(false)` when already last.
    pub fn move_down(&mut self, id: &TemplateId) -> Result<bool> {
        let idx = self.index_of(id)?;
        if idx + 1 >= self.templates.len() {
            return Ok(false);
        }
        self.templates.swap(idx, idx + 1);
        Ok(true)
    }

    /// Remove a template and every override pointing at it.
    pub fn remove_template(&mut self, id: &TemplateId) -> Result<Template> {
        let idx = self.index_of(id)?;
        let removed = self.templates.remove(idx);
        self.prune_overrides();
        Ok(removed)
    }

    /// Append templates read from files. Returns how many were added.
    pub fn import_templates(&mut self, files: Vec<TemplateFile>) -> usize {
        let count = files.len();
        for file in files {
            self.add_template(&file.name, &file.content);
        }
        count
    }

    /// Pin a recipient to a template. The template must exist in this profile.
    pub fn set_override(&mut self, email: &str, id: &TemplateId) -> Result<()> {
        let key = normalize_email(email);
        if key.is_empty() {
            return Err(Error::Profile("Email is required for an override.".to_string()));
        }
        self.index_of(id)?;
        self.overrides.insert(key, id.clone());
        Ok(())
    }

    /// Returns whether an override existed.
    pub fn clear_override(&mut self, email: &str) -> bool {
        self.overrides.remove(&normalize_email(email)).is_some()
    }

    /// Drop overrides whose template no longer exists. Returns how many were dropped.
    pub fn prune_overrides(&mut self) -> usize {
        let ids: HashSet<&TemplateId> = self.templates.iter().map(|t| &t.id).collect();
        let before = self.overrides.len();
        self.overrides.retain(|_, id| ids.contains(id));
        let dropped = before - self.overrides.len();
        if dropped > 0 {
            log::debug!("pruned {} dangling override(s) in {}", dropped, self.name);
        }
        dropped
    }

    /// Repair loaded data: unique template ids, normalized override keys,
    /// no dangling overrides.
    pub fn repair(&mut self) {
        self.name = self.name.trim().to_string();

        let mut seen = HashSet::new();
        for t in &mut self.templates {
            if !seen.insert(t.id.clone()) {
                t.id = TemplateId::generate();
                seen.insert(t.id.clone());
            }
        }

        let overrides = std::mem::take(&mut self.overrides);
        self.overrides = overrides
            .into_iter()
            .map(|(email, id)| (normalize_email(&email), id))
            .filter(|(email, _)| !email.is_empty())
            .collect();
        self.prune_overrides();
    }
}

/// All profiles in display order plus the active one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileBook {
    profiles: Vec<Profile>,
    active: String,
}

impl Default for ProfileBook {
    fn default() -> Self {
        Self {
            profiles: vec![Profile::new(DEFAULT_PROFILE_NAME)],
            active: DEFAULT_PROFILE_NAME.to_string(),
        }
    }
}

impl ProfileBook {
    /// Build from loaded pieces, repairing whatever is inconsistent:
    /// blank or duplicate names are dropped, an empty book gets a `Default`
    /// profile, and an unknown active name falls back to the first profile.
    pub fn from_parts(profiles: Vec<Profile>, active: Option<String>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(profiles.len());
        for mut profile in profiles {
            profile.repair();
            if profile.name.is_empty() || !seen.insert(profile.name.to_lowercase()) {
                log::warn!("dropping profile with blank or duplicate name {:?}", profile.name);
                continue;
            }
            kept.push(profile);
        }

        if kept.is_empty() {
            return Self::default();
        }

        let active = active
            .and_then(|a| {
                kept.iter()
                    .find(|p| same_name(&p.name, &a))
                    .map(|p| p.name.clone())
            })
            .unwrap_or_else(|| kept[0].name.clone());

        Self {
            profiles: kept,
            active,
        }
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.profiles
            .iter()
            .position(|p| same_name(&p.name, name))
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| Error::Profile(format!("No profile named \"{}\".", name.trim())))
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.position(name).map(|i| &self.profiles[i])
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn active(&self) -> &Profile {
        let idx = self.position(&self.active).unwrap_or(0);
        &self.profiles[idx]
    }

    pub fn active_mut(&mut self) -> &mut Profile {
        let idx = self.position(&self.active).unwrap_or(0);
        &mut self.profiles[idx]
    }

    /// Clone of the active profile for a preview or generation pass
    pub fn snapshot(&self) -> ProfileSnapshot {
        self.active().clone()
    }

    /// Check a proposed profile name and return it trimmed.
    ///
    /// `renaming` names the profile being renamed; it is ignored in the
    /// duplicate check so its case can change.
    pub fn validate_name(&self, name: &str, renaming: Option<&str>) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Profile("Name is required.".to_string()));
        }
        if name.chars().count() > MAX_PROFILE_NAME_LEN {
            return Err(Error::Profile(format!(
                "Name is too long (max {} characters).",
                MAX_PROFILE_NAME_LEN
            )));
        }
        let clash = self.profiles.iter().any(|p| {
            let is_self = renaming.is_some_and(|r| same_name(&p.name, r));
            !is_self && same_name(&p.name, name)
        });
        if clash {
            return Err(Error::Profile(
                "A profile with that name already exists.".to_string(),
            ));
        }
        Ok(name.to_string())
    }

    /// Add an empty profile and make it active.
    pub fn create(&mut self, name: &str) -> Result<&Profile> {
        let name = self.validate_name(name, None)?;
        self.profiles.push(Profile::new(name.clone()));
        self.active = name;
        Ok(self.active())
    }

    /// `"X Copy"`, then `"X Copy (2)"`, `"X Copy (3)"`, ... until unused
    pub fn suggest_copy_name(&self, src: &str) -> String {
        let base = format!("{} Copy", src.trim());
        let taken: HashSet<String> = self.names().map(|n| n.to_lowercase()).collect();
        let mut candidate = base.clone();
        let mut counter = 2;
        while taken.contains(&candidate.to_lowercase()) {
            candidate = format!("{} ({})", base, counter);
            counter += 1;
        }
        candidate
    }

    /// Copy `src` under a new name (suggested when `None`) and make it active.
    ///
    /// Template ids are kept so the copied overrides stay valid.
    pub fn duplicate(&mut self, src: &str, new_name: Option<&str>) -> Result<&Profile> {
        let idx = self.require(src)?;
        let name = match new_name {
            Some(n) => self.validate_name(n, None)?,
            None => self.suggest_copy_name(&self.profiles[idx].name),
        };
        let mut copy = self.profiles[idx].clone();
        copy.name = name.clone();
        self.profiles.push(copy);
        self.active = name;
        Ok(self.active())
    }

    /// Rename in place; order and active status are kept.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let idx = self.require(old)?;
        let old_name = self.profiles[idx].name.clone();
        let new_name = self.validate_name(new, Some(&old_name))?;
        if self.active == old_name {
            self.active = new_name.clone();
        }
        self.profiles[idx].name = new_name;
        Ok(())
    }

    /// Delete a profile. The last remaining profile cannot be deleted.
    /// Deleting the active one activates the previous profile in order.
    pub fn delete(&mut self, name: &str) -> Result<Profile> {
        let idx = self.require(name)?;
        if self.profiles.len() <= 1 {
            return Err(Error::Profile(
                "At least one profile must exist.".to_string(),
            ));
        }
        let removed = self.profiles.remove(idx);
        if removed.name == self.active {
            let next = idx.saturating_sub(1).min(self.profiles.len() - 1);
            self.active = self.profiles[next].name.clone();
        }
        Ok(removed)
    }

    pub fn switch(&mut self, name: &str) -> Result<()> {
        let idx = self.require(name)?;
        self.active = self.profiles[idx].name.clone();
        Ok(())
    }

    /// Replace the stored copy of a profile (matched by name).
    pub fn replace(&mut self, profile: Profile) -> Result<()> {
        let idx = self.require(&profile.name)?;
        self.profiles[idx] = profile;
        Ok(())
    }
}
