//! Configuration Management
//!
//! Client settings, persisted as YAML in the user's config directory.
//! Precedence: CLI flags > environment > config file > defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.linode.com/v4";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
/// Seconds after which volatile fields are refetched
pub const DEFAULT_VOLATILE_REFRESH_SECS: u64 = 15;

pub const TOKEN_ENV: &str = "LAPI_TOKEN";
pub const BASE_URL_ENV: &str = "LAPI_BASE_URL";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, without a trailing slash
    pub base_url: String,
    /// Personal access token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Items requested per list page
    pub page_size: u32,
    pub volatile_refresh_secs: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
            volatile_refresh_secs: DEFAULT_VOLATILE_REFRESH_SECS,
            user_agent: format!("lapi/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lapi").join("config.yaml"))
    }

    /// Load from the default path, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            Error::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let io_err =
            |e: std::io::Error| Error::Config(format!("cannot write {}: {}", path.display(), e));

        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("cannot encode config: {}", e)))?;
        std::fs::write(path, content).map_err(io_err)?;

        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.is_empty() {
                self.token = Some(token);
            }
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid base_url '{}': {}", self.base_url, e)))?;
        Ok(())
    }

    pub fn volatile_refresh(&self) -> Duration {
        Duration::from_secs(self.volatile_refresh_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_from(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.volatile_refresh(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "token: abc\npage_size: 25\n").unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = ClientConfig {
            token: Some("t".to_string()),
            volatile_refresh_secs: 30,
            ..ClientConfig::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(ClientConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        std::fs::write(&path, "page_size: 0\n").unwrap();
        assert!(ClientConfig::load_from(&path).is_err());

        std::fs::write(&path, "base_url: not a url\n").unwrap();
        assert!(ClientConfig::load_from(&path).is_err());
    }
}
