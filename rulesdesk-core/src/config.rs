//! Configuration management
//!
//! Settings live in `settings.json` inside the rulesdesk directory:
//! ```json
//! {
//!   "api": { "baseUrl": "https://rules-management.local.dev", "prefix": "/api/v1", "timeoutSecs": 30 },
//!   "rules": { "pageSize": 20 },
//!   "session": { "token": "..." }
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::http::{DEFAULT_API_PREFIX, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::services::DEFAULT_PAGE_SIZE;

/// Name of the settings file inside the rulesdesk directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api: ApiSettings,
    #[serde(default)]
    rules: RulesSettings,
    #[serde(default)]
    session: SessionSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RulesSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page_size: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// Rulesdesk configuration (resolved view of settings and environment)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
    pub api_prefix: String,
    pub timeout_secs: u64,
    pub page_size: u32,
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            token: None,
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load config from the rulesdesk directory
    ///
    /// Environment overrides (for CI/testing):
    /// - RULESDESK_API_URL
    /// - RULESDESK_TOKEN
    /// - RULESDESK_TIMEOUT_SECS
    pub fn load(rulesdesk_dir: &Path) -> Result<Self> {
        let mut config = Self::from_file(rulesdesk_dir)?;

        if let Some(url) = env_value("RULESDESK_API_URL") {
            config.api_base_url = url;
        }
        if let Some(token) = env_value("RULESDESK_TOKEN") {
            config.token = Some(token);
        }
        if let Some(raw) = env_value("RULESDESK_TIMEOUT_SECS") {
            config.timeout_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid RULESDESK_TIMEOUT_SECS: {}", raw))?;
        }

        Ok(config)
    }

    /// Load from settings.json only, ignoring the environment
    pub fn from_file(rulesdesk_dir: &Path) -> Result<Self> {
        let raw = read_settings(rulesdesk_dir)?;
        let defaults = Self::default();

        Ok(Self {
            api_base_url: raw.api.base_url.unwrap_or(defaults.api_base_url),
            api_prefix: raw.api.prefix.unwrap_or(defaults.api_prefix),
            timeout_secs: raw.api.timeout_secs.unwrap_or(defaults.timeout_secs),
            page_size: raw
                .rules
                .page_size
                .filter(|size| *size > 0)
                .unwrap_or(defaults.page_size),
            token: raw.session.token.filter(|t| !t.is_empty()),
        })
    }

    /// Save config to the rulesdesk directory
    /// Preserves other settings that the CLI doesn't manage
    ///
    /// Writes every resolved field, environment overrides included. Use
    /// [`Config::save_token`] to persist a session change alone.
    pub fn save(&self, rulesdesk_dir: &Path) -> Result<()> {
        let mut settings = read_settings(rulesdesk_dir)?;

        // Update only the fields we manage
        settings.api.base_url = Some(self.api_base_url.clone());
        settings.api.prefix = Some(self.api_prefix.clone());
        settings.api.timeout_secs = Some(self.timeout_secs);
        settings.rules.page_size = Some(self.page_size);
        settings.session.token = self.token.clone();

        write_settings(rulesdesk_dir, &settings)
    }

    /// Write `session.token` and leave every other key on disk untouched
    pub fn save_token(&self, rulesdesk_dir: &Path) -> Result<()> {
        let mut settings = read_settings(rulesdesk_dir)?;
        settings.session.token = self.token.clone();
        write_settings(rulesdesk_dir, &settings)
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }
}

/// Unreadable or malformed settings fall back to defaults
fn read_settings(rulesdesk_dir: &Path) -> Result<SettingsFile> {
    let settings_path = rulesdesk_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

fn write_settings(rulesdesk_dir: &Path, settings: &SettingsFile) -> Result<()> {
    std::fs::create_dir_all(rulesdesk_dir)
        .with_context(|| format!("Failed to create directory {}", rulesdesk_dir.display()))?;
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(rulesdesk_dir.join(SETTINGS_FILE), content)?;
    Ok(())
}
