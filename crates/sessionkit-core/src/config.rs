//! Application configuration management.
//!
//! Holds the issuer base URL, the last used username, and whether the
//! session should live in the OS keychain instead of a plain file.
//!
//! Configuration is stored at `~/.config/sessionkit/config.json`; the
//! base URL can be overridden with the `SESSIONKIT_BASE_URL` environment
//! variable.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "sessionkit";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured base URL
const BASE_URL_ENV: &str = "SESSIONKIT_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub last_username: Option<String>,
    #[serde(default)]
    pub secure_storage: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Issuer base URL, preferring the environment over the config file
    pub fn base_url(&self) -> Option<String> {
        std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.base_url.clone())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the persisted session file
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.base_url.is_none());
        assert!(config.last_username.is_none());
        assert!(!config.secure_storage);
    }

    #[test]
    fn round_trips_through_json() {
        let config = Config {
            base_url: Some("https://issuer.example.com/api".into()),
            last_username: Some("alice".into()),
            secure_storage: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.base_url.as_deref(), Some("https://issuer.example.com/api"));
        assert_eq!(back.last_username.as_deref(), Some("alice"));
        assert!(back.secure_storage);
    }
}
