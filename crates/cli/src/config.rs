//! Persisted CLI configuration
//!
//! Key/value settings stored as JSON under the user's config directory.
//! Missing file or keys fall back to documented defaults.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Config key naming the container to monitor.
pub const KEY_TARGET_CONTAINER: &str = "target-container-name";

const DEFAULT_TARGET_CONTAINER: &str = "nginx-alpine";

/// Persisted monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(rename = "target-container-name")]
    pub target_container_name: Option<String>,
}

impl Config {
    /// Load configuration from file, or defaults if none exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to file, creating the directory if needed.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Name of the container to monitor, defaulted if unset.
    pub fn target_container(&self) -> &str {
        self.target_container_name
            .as_deref()
            .unwrap_or(DEFAULT_TARGET_CONTAINER)
    }

    /// All known keys with their effective values.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![(KEY_TARGET_CONTAINER, self.target_container().to_string())]
    }

    /// Effective value for `key`, if the key is known.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            KEY_TARGET_CONTAINER => Some(self.target_container().to_string()),
            _ => None,
        }
    }

    /// Set `key` to `value` in memory; `save` persists it.
    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        match key {
            KEY_TARGET_CONTAINER => {
                self.target_container_name = Some(value);
                Ok(())
            }
            _ => bail!("unknown config key `{key}`"),
        }
    }

    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home
            .join(".config")
            .join("container-monitor")
            .join("config.json"))
    }
}
