use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tool configuration, read from `config.toml` in the user config
/// directory. Every field has a default so a missing file is fine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Byte quota enforced on the primary tier.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
    /// Override for the store directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            quota_bytes: default_quota_bytes(),
            data_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_secs: default_interval_secs(),
            debounce_secs: default_debounce_secs(),
        }
    }
}

/// Load configuration from the user config directory, falling back to
/// defaults when no file exists.
///
/// # Errors
///
/// Returns an error only when a config file exists but cannot be read or
/// parsed.
pub fn load_config() -> Result<Config> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(Config::default());
    };
    load_config_from(&config_dir.join("markbook/config.toml"))
}

/// Load configuration from an explicit path.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the store directory: CLI override, then config override, then
/// the platform data directory.
#[must_use]
pub fn resolve_data_dir(cli_override: Option<&Path>, config: &Config) -> PathBuf {
    if let Some(dir) = cli_override {
        return dir.to_path_buf();
    }
    if let Some(dir) = &config.storage.data_dir {
        return dir.clone();
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("markbook")
}

const fn default_true() -> bool {
    true
}

const fn default_quota_bytes() -> u64 {
    5 * 1024 * 1024
}

const fn default_interval_secs() -> u64 {
    30
}

const fn default_debounce_secs() -> u64 {
    2
}
