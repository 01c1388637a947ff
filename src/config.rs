//! Configuration Management
//!
//! Handles persistent configuration storage for cloudcache.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::store::{SessionMode, StoreOptions, DEFAULT_PAGE_COUNT};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8443";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_page_count() -> u64 {
    DEFAULT_PAGE_COUNT
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Console API root
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as the `Organization` header
    #[serde(default)]
    pub organization: Option<String>,
    /// Sent as the `Csrf-Token` header
    #[serde(default)]
    pub csrf_token: Option<String>,
    /// Rows per page for every resource list
    #[serde(default = "default_page_count")]
    pub page_count: u64,
    #[serde(default)]
    pub session: SessionMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            organization: None,
            csrf_token: None,
            page_count: DEFAULT_PAGE_COUNT,
            session: SessionMode::Admin,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudcache").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn effective_base_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            page_count: self.page_count,
            session: self.session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json"));
        assert_eq!(config, Config::default());
        assert_eq!(config.page_count, 20);
        assert_eq!(config.session, SessionMode::Admin);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            base_url: "https://console.example.com/".to_string(),
            organization: Some("org1".to_string()),
            csrf_token: Some("token".to_string()),
            page_count: 50,
            session: SessionMode::User,
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_partial_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, r#"{"session": "user"}"#).unwrap();
        let partial = Config::load_from(&path);
        assert_eq!(partial.session, SessionMode::User);
        assert_eq!(partial.base_url, DEFAULT_BASE_URL);

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_effective_base_url_and_options() {
        let config = Config {
            base_url: "https://console.example.com//".to_string(),
            page_count: 5,
            ..Config::default()
        };
        assert_eq!(config.effective_base_url(), "https://console.example.com");

        let options = config.store_options();
        assert_eq!(options.page_count, 5);
        assert_eq!(options.session, SessionMode::Admin);
    }
}
