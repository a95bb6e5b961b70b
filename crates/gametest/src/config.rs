//! Configuration management for the gametest runner.
//!
//! This module handles loading and validation of runner configuration from
//! TOML files and command-line arguments.

use gametest_world::SimWorldConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_wait_timeout_ms() -> u64 {
    10_000
}

/// Application configuration loaded from a TOML file.
///
/// Encompasses all runner settings: the simulated world's timings, harness
/// defaults, and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Simulated world timings and radii
    #[serde(default)]
    pub world: SimWorldConfig,
    /// Harness defaults
    #[serde(default)]
    pub harness: HarnessSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Harness defaults applied to every test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessSettings {
    /// Fallback timeout for event waits that do not specify their own,
    /// in milliseconds (0 disables the fallback)
    #[serde(default = "default_wait_timeout_ms")]
    pub default_wait_timeout_ms: u64,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            default_wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

/// Logging system configuration.
///
/// Controls log output format and level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            world: SimWorldConfig::default(),
            harness: HarnessSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at
    /// the specified path and returns the default configuration.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        if self.world.action_ack_timeout_ms == 0 {
            return Err("world.action_ack_timeout_ms must be greater than 0".to_string());
        }
        if self.world.creeper_fuse_ms == 0 {
            return Err("world.creeper_fuse_ms must be greater than 0".to_string());
        }
        if self.world.move_attempt_interval_ms == 0 {
            return Err("world.move_attempt_interval_ms must be greater than 0".to_string());
        }
        if self.world.blast_radius < 0 {
            return Err("world.blast_radius must not be negative".to_string());
        }

        Ok(())
    }
}
