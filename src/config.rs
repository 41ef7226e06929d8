//! Configuration loaded from ~/.gritcard/config.toml

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::stats::DEFAULT_TTL_HOURS;

/// User-editable settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Display name pushed to the leaderboard
    #[serde(default = "default_username")]
    pub username: String,

    /// Base URL of the ranking service; leaderboard sync is disabled
    /// when unset
    #[serde(default)]
    pub leaderboard_url: Option<String>,

    /// Whether phone-usage tracking was granted. Off by default: the
    /// usage-based adjustments only ever apply when explicitly enabled.
    #[serde(default)]
    pub usage_access: bool,

    /// How long a computed rating snapshot stays fresh
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,

    /// Override for the database location (defaults to ~/.gritcard/gritcard.db)
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

fn default_username() -> String {
    whoami_fallback()
}

fn default_cache_ttl_hours() -> u64 {
    DEFAULT_TTL_HOURS
}

fn whoami_fallback() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "player".to_string())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: default_username(),
            leaderboard_url: None,
            usage_access: false,
            cache_ttl_hours: default_cache_ttl_hours(),
            db_path: None,
        }
    }
}

impl Config {
    /// Get the global config directory path (~/.gritcard/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gritcard")
    }

    /// Get the global config file path (~/.gritcard/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Resolved database path
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| Self::global_config_dir().join("gritcard.db"))
    }

    /// Load the global configuration, creating a default file on first run
    pub fn load() -> Result<Self> {
        let path = Self::global_config_path();
        if !path.exists() {
            let config = Self::default();
            config.save_to_file(&path)?;
            eprintln!("Created {}", path.display());
            return Ok(config);
        }
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save with the atomic write pattern (temp file + rename) so a
    /// crash mid-write never corrupts the config.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let temp_path = path.with_extension("toml.tmp");
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        temp_file
            .write_all(content.as_bytes())
            .context("Failed to write config content")?;
        temp_file.sync_all().context("Failed to sync config file")?;

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename config file: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            username: "ada".to_string(),
            leaderboard_url: Some("https://rank.example.com".to_string()),
            usage_access: true,
            cache_ttl_hours: 12,
            db_path: None,
        };
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.username, "ada");
        assert_eq!(loaded.cache_ttl_hours, 12);
        assert!(loaded.usage_access);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "username = \"ada\"\n").unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.username, "ada");
        assert_eq!(loaded.cache_ttl_hours, DEFAULT_TTL_HOURS);
        assert!(!loaded.usage_access);
        assert!(loaded.leaderboard_url.is_none());
    }
}
