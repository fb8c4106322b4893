//! License validation
//!
//! Licenses live in a published spreadsheet (one row per key). A key is
//! valid when its row is active and either unbound or bound to this machine.
//! Unbound keys are bound through an HTTP endpoint when one is configured.
//!
//! Online checks are throttled: a successful validation is cached in the
//! store and reused until `license_recheck_minutes` have passed.

use crate::data_source::csv::parse_csv_str;
use crate::data_source::sheet::fetch_text;
use crate::error::{DraftMateError, Result};
use crate::store::Store;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

const ACTIVE_STATUSES: &[&str] = &["active", "1", "true", "yes", "enabled"];

/// Outcome of one validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseStatus {
    pub valid: bool,
    pub message: String,
}

impl LicenseStatus {
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Checks a key against the license authority
#[async_trait::async_trait]
pub trait LicenseValidator {
    async fn validate(&self, key: &str) -> Result<LicenseStatus>;
}

/// Persisted license state (global, not per profile)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseState {
    #[serde(default)]
    pub key: Option<String>,
    /// Time of the last successful online validation
    #[serde(default)]
    pub last_validated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: String,
}

impl LicenseState {
    /// Whether a cached success for `key` is still fresh at `now`
    pub fn is_fresh(&self, key: &str, now: DateTime<Utc>, recheck_minutes: i64) -> bool {
        match (&self.key, self.last_validated) {
            (Some(k), Some(at)) if k == key => now - at < Duration::minutes(recheck_minutes),
            _ => false,
        }
    }
}

/// Device fingerprint: SHA-256 of the install id, first 16 hex chars
pub fn machine_id(install_id: &str) -> String {
    let digest = Sha256::digest(install_id.trim().to_lowercase().as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// `" License Key "` → `"license_key"`
fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Parse the license table into rows keyed by normalized header
pub fn parse_license_table(csv_text: &str) -> Result<Vec<HashMap<String, String>>> {
    let dataset = parse_csv_str(csv_text)?;
    Ok(dataset
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|(h, v)| (normalize_header(h), v.trim().to_string()))
                .collect()
        })
        .collect())
}

/// Result of looking a key up in the license table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Active and bound to this machine
    Bound,
    /// Active but not bound to any machine yet
    Unbound,
    Invalid(String),
}

/// Match `key` (exact, case-sensitive) and check status and binding.
pub fn evaluate(rows: &[HashMap<String, String>], key: &str, machine_id: &str) -> Lookup {
    let Some(row) = rows
        .iter()
        .find(|r| r.get("license_key").map(String::as_str) == Some(key))
    else {
        return Lookup::Invalid("No matching license entry found for this key.".into());
    };

    let status = row.get("status").map(|s| s.trim()).unwrap_or_default();
    if !ACTIVE_STATUSES.contains(&status.to_lowercase().as_str()) {
        return Lookup::Invalid(format!("License found but status='{}'.", status));
    }

    let bound_to = row.get("machine_id").map(|s| s.trim()).unwrap_or_default();
    if bound_to.is_empty() {
        Lookup::Unbound
    } else if bound_to == machine_id {
        Lookup::Bound
    } else {
        let short: String = bound_to.chars().take(6).collect();
        Lookup::Invalid(format!("License is bound to another device ({}…).", short))
    }
}

#[derive(Serialize)]
struct BindRequest<'a> {
    action: &'a str,
    license_key: &'a str,
    machine_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<&'a str>,
}

#[derive(Deserialize)]
struct BindResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    msg: Option<String>,
}

/// Validator backed by a published license sheet and a bind endpoint
#[derive(Debug, Clone)]
pub struct SheetLicenseValidator {
    client: reqwest::Client,
    sheet_url: String,
    bind_url: Option<String>,
    bind_secret: Option<String>,
    machine_id: String,
}

impl SheetLicenseValidator {
    pub fn new(
        client: reqwest::Client,
        sheet_url: impl Into<String>,
        bind_url: Option<String>,
        bind_secret: Option<String>,
        machine_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            sheet_url: sheet_url.into(),
            bind_url,
            bind_secret,
            machine_id: machine_id.into(),
        }
    }

    async fn lookup(&self, key: &str) -> Result<Lookup> {
        let text = fetch_text(&self.client, &self.sheet_url).await?;
        let rows = parse_license_table(&text)?;
        Ok(evaluate(&rows, key, &self.machine_id))
    }

    async fn bind(&self, bind_url: &str, key: &str) -> Result<LicenseStatus> {
        let request = BindRequest {
            action: "bind",
            license_key: key,
            machine_id: &self.machine_id,
            secret: self.bind_secret.as_deref(),
        };
        let body = self
            .client
            .post(bind_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let response: BindResponse = serde_json::from_str(&body).map_err(|_| {
            let preview: String = body.chars().take(160).collect();
            DraftMateError::LicenseInvalid(format!("Bind: invalid JSON response: {}", preview))
        })?;
        let default_msg = if response.ok { "Bind ok" } else { "Bind failed" };
        let message = response.msg.unwrap_or_else(|| default_msg.to_string());
        Ok(LicenseStatus {
            valid: response.ok,
            message,
        })
    }
}

#[async_trait::async_trait]
impl LicenseValidator for SheetLicenseValidator {
    async fn validate(&self, key: &str) -> Result<LicenseStatus> {
        match self.lookup(key).await? {
            Lookup::Bound => Ok(LicenseStatus::valid("License validated for this device.")),
            Lookup::Invalid(why) => Ok(LicenseStatus::invalid(why)),
            Lookup::Unbound => {
                let Some(bind_url) = self.bind_url.as_deref() else {
                    return Ok(LicenseStatus::valid(
                        "License valid (not yet bound to any device).",
                    ));
                };
                let bound = self.bind(bind_url, key).await?;
                if !bound.valid {
                    return Ok(LicenseStatus::invalid(format!(
                        "License valid but binding failed: {}",
                        bound.message
                    )));
                }
                match self.lookup(key).await? {
                    Lookup::Bound => Ok(LicenseStatus::valid(
                        "License validated and bound to this device.",
                    )),
                    Lookup::Unbound => Ok(LicenseStatus::invalid(
                        "License bound but re-check still shows it unbound.",
                    )),
                    Lookup::Invalid(why) => Ok(LicenseStatus::invalid(format!(
                        "License bound but re-check failed: {}",
                        why
                    ))),
                }
            }
        }
    }
}

/// Validator that accepts everything (`DRAFTMATE_SKIP_LICENSE=1`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipLicense;

#[async_trait::async_trait]
impl LicenseValidator for SkipLicense {
    async fn validate(&self, _key: &str) -> Result<LicenseStatus> {
        Ok(LicenseStatus::valid("License check skipped."))
    }
}

/// Validator picked from configuration at startup
#[derive(Debug, Clone)]
pub enum ConfiguredValidator {
    Sheet(SheetLicenseValidator),
    Skip(SkipLicense),
    /// No license sheet configured
    Missing,
}

#[async_trait::async_trait]
impl LicenseValidator for ConfiguredValidator {
    async fn validate(&self, key: &str) -> Result<LicenseStatus> {
        match self {
            ConfiguredValidator::Sheet(v) => v.validate(key).await,
            ConfiguredValidator::Skip(v) => v.validate(key).await,
            ConfiguredValidator::Missing => Err(DraftMateError::LicenseInvalid(
                "No license sheet configured. Set one with `draftmate config --license-sheet-url URL`"
                    .into(),
            )),
        }
    }
}

/// Make sure a valid license is present, going online only when the cached
/// success is stale (or `force` is set).
///
/// `key_override` (e.g. from the environment) takes precedence over the
/// stored key and is not persisted.
pub async fn ensure_licensed<V: LicenseValidator>(
    validator: &V,
    store: &Store,
    key_override: Option<&str>,
    recheck_minutes: i64,
    force: bool,
    now: DateTime<Utc>,
) -> Result<LicenseStatus> {
    let mut state = store.load_license();
    let key = key_override
        .map(str::to_string)
        .or_else(|| state.key.clone())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| DraftMateError::LicenseInvalid("No license key entered.".into()))?;

    if !force && state.is_fresh(&key, now, recheck_minutes) {
        log::debug!("using cached license validation from {:?}", state.last_validated);
        return Ok(LicenseStatus::valid(state.message.clone()));
    }

    let status = validator.validate(&key).await?;
    log::info!("license check: {}", status.message);

    if key_override.is_none() {
        state.key = Some(key);
        state.last_validated = status.valid.then_some(now);
        state.message = status.message.clone();
        store.save_license(&state)?;
    }

    if status.valid {
        Ok(status)
    } else {
        Err(DraftMateError::LicenseInvalid(status.message))
    }
}

/// Store a new key and validate it online right away.
pub async fn activate<V: LicenseValidator>(
    validator: &V,
    store: &Store,
    key: &str,
    now: DateTime<Utc>,
) -> Result<LicenseStatus> {
    let key = key.trim();
    if key.is_empty() {
        return Err(DraftMateError::LicenseInvalid("No license key entered.".into()));
    }
    store.save_license(&LicenseState {
        key: Some(key.to_string()),
        last_validated: None,
        message: String::new(),
    })?;
    ensure_licensed(validator, store, None, 0, true, now).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "License Key,Status,Machine ID\n\
                         K-1,Active,\n\
                         K-2,yes,abcdef0123456789\n\
                         K-3,revoked,\n\
                         K-4,active,ffffffffffffffff\n";

    #[test]
    fn test_machine_id_shape() {
        let id = machine_id("1b4e28ba-2fa1-11d2-883f-0016d3cca427");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, machine_id(" 1B4E28BA-2FA1-11D2-883F-0016D3CCA427 "));
    }

    #[test]
    fn test_evaluate_table() {
        let rows = parse_license_table(TABLE).unwrap();
        let me = "abcdef0123456789";
        assert_eq!(evaluate(&rows, "K-1", me), Lookup::Unbound);
        assert_eq!(evaluate(&rows, "K-2", me), Lookup::Bound);
        assert!(matches!(evaluate(&rows, "K-3", me), Lookup::Invalid(m) if m.contains("revoked")));
        assert!(matches!(evaluate(&rows, "K-4", me), Lookup::Invalid(m) if m.contains("ffffff…")));
        // keys are case-sensitive
        assert!(matches!(evaluate(&rows, "k-1", me), Lookup::Invalid(_)));
    }

    #[test]
    fn test_freshness() {
        let now = Utc::now();
        let state = LicenseState {
            key: Some("K".into()),
            last_validated: Some(now - Duration::minutes(10)),
            message: "ok".into(),
        };
        assert!(state.is_fresh("K", now, 60));
        assert!(!state.is_fresh("K", now, 5));
        assert!(!state.is_fresh("OTHER", now, 60));
        assert!(!LicenseState::default().is_fresh("K", now, 60));
    }
}
