//! Configuration data model and validation

use crate::error::{AppError, Result};
use crate::logging::{LogFormat, LogLevel};
use crate::models::ServerSelector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Measurement backend served by the exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// External `bbk` command-line binary
    Bbk,
    /// speedtest.net server network
    Speedtest,
}

impl FromStr for Backend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bbk" => Ok(Backend::Bbk),
            "speedtest" => Ok(Backend::Speedtest),
            other => Err(AppError::config(format!(
                "Unknown backend '{}': expected 'bbk' or 'speedtest'",
                other
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Bbk => f.write_str("bbk"),
            Backend::Speedtest => f.write_str("speedtest"),
        }
    }
}

/// Main application configuration, read-only after startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_backend")]
    pub backend: Backend,

    /// Path of the bbk binary
    #[serde(default = "default_bbk_binary")]
    pub bbk_binary_path: PathBuf,

    /// speedtest.net server ID, -1 selects the nearest server
    #[serde(default = "default_server_id")]
    pub server_id: i64,

    /// Accept a different server when the configured ID is not matched exactly
    #[serde(default)]
    pub server_fallback: bool,

    /// Deadline for one bbk invocation
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_seconds: u64,

    /// Per-request timeout for the speedtest.net HTTP client
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_seconds: u64,

    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    #[serde(default = "default_enable_color")]
    pub enable_color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bbk_binary_path: default_bbk_binary(),
            server_id: default_server_id(),
            server_fallback: false,
            command_timeout_seconds: default_command_timeout_secs(),
            http_timeout_seconds: default_http_timeout_secs(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            enable_color: default_enable_color(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn server_selector(&self) -> ServerSelector {
        ServerSelector::from_id(self.server_id)
    }

    /// Validate the configuration and return the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.bbk_binary_path.as_os_str().is_empty() {
            return Err(AppError::config("bbk binary path cannot be empty"));
        }

        if self.server_id < ServerSelector::NEAREST_SENTINEL {
            return Err(AppError::config(format!(
                "Invalid server ID {}: use a positive ID or -1 for the nearest server",
                self.server_id
            )));
        }

        for (name, value) in [
            ("Command timeout", self.command_timeout_seconds),
            ("HTTP timeout", self.http_timeout_seconds),
        ] {
            if value == 0 {
                return Err(AppError::config(format!("{} must be greater than 0", name)));
            }
            if value > crate::defaults::MAX_TIMEOUT_SECS {
                return Err(AppError::config(format!(
                    "{} cannot exceed {} seconds",
                    name,
                    crate::defaults::MAX_TIMEOUT_SECS
                )));
            }
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("EXPORTER_BACKEND") {
            self.backend = backend.parse()?;
        }

        if let Ok(path) = std::env::var("BBK_BINARY") {
            self.bbk_binary_path = PathBuf::from(path.trim());
        }

        if let Ok(server_id) = std::env::var("SPEEDTEST_SERVER_ID") {
            self.server_id = server_id.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid SPEEDTEST_SERVER_ID value '{}': {}", server_id, e))
            })?;
        }

        if let Ok(fallback) = std::env::var("SPEEDTEST_SERVER_FALLBACK") {
            self.server_fallback = fallback.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid SPEEDTEST_SERVER_FALLBACK value '{}': {}", fallback, e))
            })?;
        }

        if let Ok(timeout) = std::env::var("BBK_TIMEOUT_SECONDS") {
            self.command_timeout_seconds = timeout.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid BBK_TIMEOUT_SECONDS value '{}': {}", timeout, e))
            })?;
        }

        if let Ok(timeout) = std::env::var("SPEEDTEST_HTTP_TIMEOUT_SECONDS") {
            self.http_timeout_seconds = timeout.trim().parse().map_err(|e| {
                AppError::config(format!(
                    "Invalid SPEEDTEST_HTTP_TIMEOUT_SECONDS value '{}': {}",
                    timeout, e
                ))
            })?;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.log_level = level.parse()?;
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.log_format = format.parse()?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e))
            })?;
        }

        Ok(())
    }
}

fn default_backend() -> Backend {
    Backend::Bbk
}

fn default_bbk_binary() -> PathBuf {
    PathBuf::from(crate::defaults::DEFAULT_BBK_BINARY)
}

fn default_server_id() -> i64 {
    ServerSelector::NEAREST_SENTINEL
}

fn default_command_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_COMMAND_TIMEOUT.as_secs()
}

fn default_http_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_HTTP_TIMEOUT.as_secs()
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_format() -> LogFormat {
    LogFormat::Console
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.backend, Backend::Bbk);
        assert_eq!(config.server_id, -1);
        assert_eq!(config.server_selector(), ServerSelector::Nearest);
        assert_eq!(config.command_timeout(), Duration::from_secs(120));
        assert!(!config.server_fallback);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("bbk".parse::<Backend>().unwrap(), Backend::Bbk);
        assert_eq!(" Speedtest ".parse::<Backend>().unwrap(), Backend::Speedtest);
        assert!("ookla".parse::<Backend>().is_err());
        assert_eq!(Backend::Speedtest.to_string(), "speedtest");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.server_id = -2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.command_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.http_timeout_seconds = 10_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("HTTP timeout"));

        let mut config = Config::default();
        config.bbk_binary_path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_server_id_selector() {
        let config = Config { server_id: 5001, ..Config::default() };
        assert_eq!(config.server_selector(), ServerSelector::Id(5001));
        assert!(config.validate().is_ok());
    }
}
