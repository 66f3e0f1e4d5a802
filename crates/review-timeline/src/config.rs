//! Configuration for review-timeline
//!
//! Deletion window length, sentinel display names and export settings.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Mutation rights
    pub policy: PolicyConfig,
    /// Display-name fallbacks
    pub names: NameConfig,
    /// Plain-text export
    pub export: ExportConfig,
}

/// Mutation-rights configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Minutes after creation during which an actor may delete their own update
    pub deletion_window_minutes: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            deletion_window_minutes: 15,
        }
    }
}

impl PolicyConfig {
    pub fn deletion_window(&self) -> Duration {
        Duration::minutes(i64::from(self.deletion_window_minutes))
    }
}

/// Sentinel names used when an actor cannot be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameConfig {
    pub unknown_author: String,
    pub unknown_referee: String,
}

impl Default for NameConfig {
    fn default() -> Self {
        Self {
            unknown_author: "Unknown Author".to_string(),
            unknown_referee: "Unknown Referee".to_string(),
        }
    }
}

/// Plain-text export configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Prefix joined to stored file paths to form a link
    pub file_url_prefix: String,
    /// Render a placeholder for content that exists but is hidden
    pub restricted_markers: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_url_prefix: "/api".to_string(),
            restricted_markers: true,
        }
    }
}

impl TimelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML or JSON file, chosen by extension (TOML otherwise)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_toml(&contents),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy.deletion_window_minutes == 0 {
            return Err(ConfigError::Invalid(
                "deletion_window_minutes must be positive".to_string(),
            ));
        }

        if self.names.unknown_author.trim().is_empty()
            || self.names.unknown_referee.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "sentinel names must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
