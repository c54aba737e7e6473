//! Configuration management with YAML support

use anyhow::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::CharBounds;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub conversations: ConversationConfig,

    #[serde(default)]
    pub content: ContentConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Active conversations idle this long are paused by `sweep`
    #[serde(default = "default_inactivity_timeout")]
    pub inactivity_timeout_minutes: i64,
}

/// Character window for FAQ answers that carry no bounds of their own
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default)]
    pub faq_character_min: Option<i64>,

    #[serde(default)]
    pub faq_character_max: Option<i64>,
}

// Default value functions
fn default_database_path() -> String {
    "~/.local/share/bizcrm/bizcrm.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_inactivity_timeout() -> i64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_minutes: default_inactivity_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./bizcrm.yaml (current directory)
    /// 3. ~/.config/bizcrm/bizcrm.yaml
    pub fn load(path: &str) -> Result<Self> {
        let search_paths = vec![
            shellexpand::tilde(path).to_string(),
            "bizcrm.yaml".to_string(),
            shellexpand::tilde("~/.config/bizcrm/bizcrm.yaml").to_string(),
        ];

        for search_path in &search_paths {
            if std::path::Path::new(search_path).exists() {
                let content = std::fs::read_to_string(search_path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                config.validate()?;
                return Ok(config);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    fn validate(&self) -> Result<()> {
        self.inactivity_timeout()?;
        self.faq_bounds()?;
        Ok(())
    }

    /// Get the database path, expanding ~ to home directory
    pub fn database_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.database.path).to_string();
        PathBuf::from(expanded)
    }

    pub fn inactivity_timeout(&self) -> Result<Duration> {
        timeout_minutes(
            "conversations.inactivity_timeout_minutes",
            self.conversations.inactivity_timeout_minutes,
        )
    }

    pub fn faq_bounds(&self) -> Result<CharBounds> {
        let bounds = CharBounds::new(
            self.content.faq_character_min,
            self.content.faq_character_max,
        )?;
        Ok(bounds)
    }
}

/// Positive minute count that fits a `Duration`
pub fn timeout_minutes(name: &str, minutes: i64) -> Result<Duration> {
    if minutes <= 0 {
        anyhow::bail!("{} must be positive, got {}", name, minutes);
    }
    Duration::try_minutes(minutes)
        .ok_or_else(|| anyhow::anyhow!("{} is out of range, got {}", name, minutes))
}
