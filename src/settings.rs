//! Admin settings persisted as a small JSON file.
//!
//! The file holds the defaults used when generating content and sitemaps,
//! plus optional credentials. Keys are camelCase on disk (`sitemapPriority`);
//! `set` accepts either that spelling or snake_case.

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

pub const DEFAULT_SETTINGS_FILE: &str = "admin-settings.json";

const CHANGEFREQS: [&str; 7] = ["always", "hourly", "daily", "weekly", "monthly", "yearly", "never"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminSettings {
    pub default_category: String,
    pub default_tone: String,
    /// Sitemap `<priority>` for news URLs, `"0.0"`..=`"1.0"`.
    pub sitemap_priority: String,
    pub sitemap_changefreq: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search_console: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexnow_key: Option<String>,
}

impl Default for AdminSettings {
    fn default() -> Self {
        AdminSettings {
            default_category: "tecnologia".to_string(),
            default_tone: "informativo".to_string(),
            sitemap_priority: "0.5".to_string(),
            sitemap_changefreq: "daily".to_string(),
            openai_api_key: None,
            google_search_console: None,
            indexnow_key: None,
        }
    }
}

impl AdminSettings {
    /// Update one setting by name. An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = |reason| SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason,
        };
        let optional = || (!value.is_empty()).then(|| value.to_string());

        match normalize_key(key).as_str() {
            "defaultcategory" => self.default_category = value.to_string(),
            "defaulttone" => self.default_tone = value.to_string(),
            "sitemappriority" => {
                let p: f32 = value.parse().map_err(|_| invalid("not a number"))?;
                if !(0.0..=1.0).contains(&p) {
                    return Err(invalid("must be between 0.0 and 1.0"));
                }
                self.sitemap_priority = value.to_string();
            }
            "sitemapchangefreq" => {
                if !CHANGEFREQS.contains(&value) {
                    return Err(invalid("expected always, hourly, daily, weekly, monthly, yearly or never"));
                }
                self.sitemap_changefreq = value.to_string();
            }
            "openaiapikey" => self.openai_api_key = optional(),
            "googlesearchconsole" => self.google_search_console = optional(),
            "indexnowkey" => self.indexnow_key = optional(),
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Copy safe to print: credentials are masked.
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "********".to_string());
        AdminSettings {
            openai_api_key: mask(&self.openai_api_key),
            google_search_console: self.google_search_console.clone(),
            indexnow_key: mask(&self.indexnow_key),
            ..self.clone()
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Reads and writes [`AdminSettings`] at a fixed path.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings. A missing file yields the defaults; so does a
    /// corrupt one, after a warning.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> AdminSettings {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!(error = %e, "Could not read settings; using defaults");
                }
                return AdminSettings::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Settings file is corrupt; using defaults");
            AdminSettings::default()
        })
    }

    pub async fn save(&self, settings: &AdminSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(settings)?).await?;
        info!(path = %self.path.display(), "Saved settings");
        Ok(())
    }

    /// Load, change one key, save. Returns the updated settings.
    pub async fn set(&self, key: &str, value: &str) -> Result<AdminSettings, SettingsError> {
        let mut settings = self.load().await;
        settings.set(key, value)?;
        self.save(&settings).await?;
        Ok(settings)
    }

    /// Delete the settings file so the next load returns defaults.
    pub async fn reset(&self) -> Result<(), SettingsError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Settings reset");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join(DEFAULT_SETTINGS_FILE));
        (dir, store)
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let (_dir, store) = store();
        let s = store.load().await;
        assert_eq!(s.default_category, "tecnologia");
        assert_eq!(s.default_tone, "informativo");
        assert_eq!(s.sitemap_priority, "0.5");
        assert_eq!(s.sitemap_changefreq, "daily");
        assert!(s.indexnow_key.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_gives_defaults() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "{{{").unwrap();
        assert_eq!(store.load().await, AdminSettings::default());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let (_dir, store) = store();
        std::fs::write(store.path(), r#"{"defaultTone":"formal"}"#).unwrap();
        let s = store.load().await;
        assert_eq!(s.default_tone, "formal");
        assert_eq!(s.default_category, "tecnologia");
    }

    #[tokio::test]
    async fn test_set_persists_and_reset_restores() {
        let (_dir, store) = store();
        store.set("sitemapPriority", "0.8").await.unwrap();
        store.set("indexnow_key", "abc123").await.unwrap();

        let s = store.load().await;
        assert_eq!(s.sitemap_priority, "0.8");
        assert_eq!(s.indexnow_key.as_deref(), Some("abc123"));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"sitemapPriority\": \"0.8\""));

        store.reset().await.unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.load().await, AdminSettings::default());
        store.reset().await.unwrap();
    }

    #[test]
    fn test_set_rejects_unknown_and_invalid() {
        let mut s = AdminSettings::default();
        assert!(matches!(s.set("color", "red"), Err(SettingsError::UnknownKey(_))));
        assert!(matches!(s.set("sitemap_priority", "2"), Err(SettingsError::InvalidValue { .. })));
        assert!(matches!(s.set("sitemap_priority", "alto"), Err(SettingsError::InvalidValue { .. })));
        assert!(matches!(s.set("sitemap_changefreq", "sometimes"), Err(SettingsError::InvalidValue { .. })));
        assert_eq!(s, AdminSettings::default());
    }

    #[test]
    fn test_empty_value_clears_optional() {
        let mut s = AdminSettings::default();
        s.set("openaiApiKey", "sk-1").unwrap();
        assert!(s.openai_api_key.is_some());
        s.set("openai-api-key", "").unwrap();
        assert!(s.openai_api_key.is_none());
    }

    #[test]
    fn test_redacted_masks_credentials() {
        let mut s = AdminSettings::default();
        s.set("indexnowKey", "secret").unwrap();
        let shown = s.redacted();
        assert_eq!(shown.indexnow_key.as_deref(), Some("********"));
        assert_eq!(shown.default_category, s.default_category);
    }
}
