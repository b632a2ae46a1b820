#![deny(unsafe_code)]

//! Configuration loading and validation for glowd.
//!
//! Loads TOML configuration files and validates them against expected ranges.
//! Provides the [`AppConfig`] type as the central configuration structure:
//! the serial strip parameters, the IPC daemon settings, and logging.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daemon / IPC configuration.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// LED strip and serial link configuration.
    #[serde(default)]
    pub strip: StripConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for the command listener and its clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Unix socket path the daemon listens on for command connections.
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// Maximum number of concurrently served client connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Client-side connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl DaemonConfig {
    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            max_connections: default_max_connections(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

fn default_socket_path() -> String {
    "/tmp/glowd.sock".to_string()
}

fn default_max_connections() -> usize {
    16
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

/// Configuration for the LED strip and its serial link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripConfig {
    /// Serial port path (e.g. `/dev/ttyUSB0`).
    #[serde(default = "default_serial_port")]
    pub serial_port: String,

    /// Number of LEDs on the strip (1–255).
    #[serde(default = "default_led_count")]
    pub led_count: usize,

    /// Serial baud rate.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Interval between frame transmissions in milliseconds.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// Serial read/write timeout in milliseconds.
    #[serde(default = "default_serial_timeout_ms")]
    pub serial_timeout_ms: u64,
}

impl StripConfig {
    /// Update-loop tick interval as a [`Duration`].
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    /// Serial read/write timeout as a [`Duration`].
    pub fn serial_timeout(&self) -> Duration {
        Duration::from_millis(self.serial_timeout_ms)
    }
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            serial_port: default_serial_port(),
            led_count: default_led_count(),
            baud_rate: default_baud_rate(),
            update_interval_ms: default_update_interval_ms(),
            serial_timeout_ms: default_serial_timeout_ms(),
        }
    }
}

fn default_serial_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_led_count() -> usize {
    60
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_update_interval_ms() -> u64 {
    100
}

fn default_serial_timeout_ms() -> u64 {
    1000
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
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

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.socket_path.is_empty() {
            return Err(ConfigError::Validation(
                "daemon.socket_path must not be empty".to_string(),
            ));
        }
        if self.daemon.max_connections == 0 {
            return Err(ConfigError::Validation(
                "daemon.max_connections must be at least 1".to_string(),
            ));
        }
        if self.strip.serial_port.is_empty() {
            return Err(ConfigError::Validation(
                "strip.serial_port must not be empty".to_string(),
            ));
        }
        if !(1..=255).contains(&self.strip.led_count) {
            return Err(ConfigError::Validation(format!(
                "strip.led_count must be between 1 and 255, got {}",
                self.strip.led_count
            )));
        }
        if self.strip.baud_rate == 0 {
            return Err(ConfigError::Validation(
                "strip.baud_rate must be non-zero".to_string(),
            ));
        }
        if self.strip.update_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "strip.update_interval_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
