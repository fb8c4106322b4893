//! Persisted state
//!
//! Profiles, the active profile name and the license state each live in their
//! own JSON file and are loaded independently: an unreadable file resets only
//! its own piece. Writes go through a temp file in the same directory and are
//! renamed into place.

use crate::error::{DraftMateError, Result};
use crate::license::LicenseState;
use draftmate_common::{Profile, ProfileBook};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

const PROFILES_FILE: &str = "profiles.json";
const ACTIVE_FILE: &str = "active.json";
const LICENSE_FILE: &str = "license.json";
const INSTALL_ID_FILE: &str = "install_id";

#[derive(Debug, Serialize, Deserialize)]
struct ActiveFile {
    active: String,
}

/// On-disk state rooted at one directory
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Profiles and active name; never fails, repairs what it can.
    pub fn load_book(&self) -> ProfileBook {
        let profiles = self.load_profiles();
        let active = read_json::<ActiveFile>(&self.path(ACTIVE_FILE)).map(|a| a.active);
        ProfileBook::from_parts(profiles, active)
    }

    /// Each profile is parsed on its own so one bad entry does not drop the rest.
    fn load_profiles(&self) -> Vec<Profile> {
        let Some(values) = read_json::<Vec<serde_json::Value>>(&self.path(PROFILES_FILE)) else {
            return Vec::new();
        };
        values
            .into_iter()
            .enumerate()
            .filter_map(|(i, value)| match serde_json::from_value::<Profile>(value) {
                Ok(p) => Some(p),
                Err(e) => {
                    log::warn!("skipping unreadable profile #{}: {}", i + 1, e);
                    None
                }
            })
            .collect()
    }

    pub fn save_book(&self, book: &ProfileBook) -> Result<()> {
        write_json_atomic(&self.path(PROFILES_FILE), book.profiles())?;
        write_json_atomic(
            &self.path(ACTIVE_FILE),
            &ActiveFile {
                active: book.active_name().to_string(),
            },
        )?;
        log::debug!("saved {} profile(s) to {}", book.len(), self.dir.display());
        Ok(())
    }

    pub fn load_license(&self) -> LicenseState {
        read_json(&self.path(LICENSE_FILE)).unwrap_or_default()
    }

    pub fn save_license(&self, state: &LicenseState) -> Result<()> {
        write_json_atomic(&self.path(LICENSE_FILE), state)
    }

    /// Random id created on first use and kept for the life of the install
    pub fn install_id(&self) -> Result<String> {
        let path = self.path(INSTALL_ID_FILE);
        if let Ok(existing) = std::fs::read_to_string(&path) {
            let existing = existing.trim();
            if !existing.is_empty() {
                return Ok(existing.to_string());
            }
        }
        let id = uuid::Uuid::new_v4().to_string();
        write_atomic(&path, id.as_bytes())?;
        Ok(id)
    }
}

/// `None` when the file is missing or unreadable (the latter is logged).
fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            log::warn!("cannot read {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("ignoring corrupt {}: {}", path.display(), e);
            None
        }
    }
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &content)
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| DraftMateError::Io(e.error))?;
    Ok(())
}
