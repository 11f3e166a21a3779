//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/medialog/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/medialog/` (~/.config/medialog/)
//! - Data: `$XDG_DATA_HOME/medialog/` (~/.local/share/medialog/)
//! - State/Logs: `$XDG_STATE_HOME/medialog/` (~/.local/state/medialog/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analytics configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analytics engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Seconds a cached composite dashboard stays valid
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached composite results
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    /// Number of streaks returned by the streak insight
    #[serde(default = "default_streak_limit")]
    pub streak_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            streak_limit: default_streak_limit(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_cache_capacity() -> u64 {
    256
}

fn default_streak_limit() -> usize {
    10
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "medialog_core=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when no config file exists.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Path to the config file
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("medialog").join("config.toml")
    }

    /// Path to the SQLite database
    pub fn database_path() -> PathBuf {
        xdg_data_home().join("medialog").join("medialog.db")
    }

    /// Directory for logs and other mutable state
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("medialog")
    }

    /// Path to the log file
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("medialog.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.analytics.cache_ttl_secs, 3600);
        assert_eq!(config.analytics.streak_limit, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [analytics]
            cache_ttl_secs = 60
            "#,
        )
        .expect("partial config should parse");
        assert_eq!(config.analytics.cache_ttl_secs, 60);
        assert_eq!(config.analytics.cache_capacity, 256);
    }

    #[test]
    fn test_paths_end_with_expected_names() {
        assert!(Config::config_path().ends_with("medialog/config.toml"));
        assert!(Config::database_path().ends_with("medialog/medialog.db"));
        assert!(Config::log_path().ends_with("medialog/medialog.log"));
    }
}
