// Configuration File Support
//
// This module provides configuration file parsing for the gate server.
// Supports TOML format with environment variable overrides.
// The configuration file defaults to ./agbalumo.toml; a missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::rate_limit::RateLimitConfig;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "agbalumo.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// HTTP listener configuration
    pub server: ServerConfig,

    /// Per-client admission control
    pub rate_limit: RateLimitConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation. If the config file does not exist, returns the
    /// default configuration with environment overrides applied.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config: Config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;

            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?
        } else {
            Self::default()
        };

        // Apply environment variable overrides
        let config = config.apply_env_overrides();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - AGBALUMO_LOG_LEVEL
    /// - AGBALUMO_LOG_FORMAT
    /// - AGBALUMO_HOST
    /// - AGBALUMO_PORT
    /// - RATE_LIMIT_* (see [`RateLimitConfig::apply_env_overrides`])
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("AGBALUMO_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("AGBALUMO_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(host) = std::env::var("AGBALUMO_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("AGBALUMO_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        self.rate_limit = self.rate_limit.apply_env_overrides();

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port must be > 0");
        }

        let limits = &self.rate_limit;
        if limits.sweep_interval_secs == 0 {
            anyhow::bail!("Rate limit sweep interval must be > 0 seconds");
        }
        if limits.stale_after_secs < limits.sweep_interval_secs {
            anyhow::bail!(
                "Rate limit staleness window ({}s) must be at least the sweep interval ({}s)",
                limits.stale_after_secs,
                limits.sweep_interval_secs
            );
        }

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }
}
