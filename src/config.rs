use crate::error::{DraftMateError, Result};
use draftmate_common::{HeaderAliases, PipelineOptions, PlaceholderStyle, RotationScope};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const LICENSE_KEY_ENV: &str = "DRAFTMATE_LICENSE_KEY";
pub const SKIP_LICENSE_ENV: &str = "DRAFTMATE_SKIP_LICENSE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub placeholder_style: PlaceholderStyle,
    pub rotation_scope: RotationScope,
    /// Subject for newly created profiles
    pub default_subject: String,
    pub sheet_timeout_seconds: u64,
    /// Published CSV of the license table
    pub license_sheet_url: Option<String>,
    /// Endpoint that binds an unbound license to this machine
    pub license_bind_url: Option<String>,
    /// Shared secret sent with bind requests
    pub license_bind_secret: Option<String>,
    pub license_recheck_minutes: i64,
    /// Where profiles and license state live (default: platform data dir)
    pub data_dir: Option<PathBuf>,
    /// Extra header names per field
    pub header_aliases: HeaderAliases,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DraftMateError::Config("Home directory not found".into()))?;
        Ok(home.join(".config").join("draftmate").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            placeholder_style: PlaceholderStyle::Single,
            rotation_scope: RotationScope::Global,
            default_subject: draftmate_common::DEFAULT_SUBJECT.into(),
            sheet_timeout_seconds: 15,
            license_sheet_url: None,
            license_bind_url: None,
            license_bind_secret: None,
            license_recheck_minutes: 24 * 60,
            data_dir: None,
            header_aliases: HeaderAliases::default(),
        }
    }

    /// Directory for profiles.json, active.json and license.json
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join("draftmate"))
            .ok_or_else(|| DraftMateError::Config("Data directory not found".into()))
    }

    /// Options handed to every preview and generation pass
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            aliases: self.header_aliases.clone(),
            placeholder_style: self.placeholder_style,
            rotation: self.rotation_scope,
        }
    }

    /// License key from the environment, if set
    pub fn env_license_key() -> Option<String> {
        std::env::var(LICENSE_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// `DRAFTMATE_SKIP_LICENSE=1` disables license checks (development only)
    pub fn skip_license() -> bool {
        matches!(
            std::env::var(SKIP_LICENSE_ENV).as_deref(),
            Ok("1") | Ok("true")
        )
    }
}
