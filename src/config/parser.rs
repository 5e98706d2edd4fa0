//! Configuration parsing from CLI arguments and environment variables

use crate::{cli::Cli, config::env::EnvManager, error::Result, models::Config};
use std::path::PathBuf;

/// Combines defaults, environment variables and CLI arguments (in that order)
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        EnvManager::load_env_file()?;
        self.parse_without_env_file()
    }

    /// Same as `parse` but does not read `.env`
    pub fn parse_without_env_file(&self) -> Result<Config> {
        let mut config = Config::default();
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(ref backend) = self.cli.backend {
            config.backend = backend.parse()?;
        }

        if let Some(ref path) = self.cli.bbk_binary {
            config.bbk_binary_path = PathBuf::from(path);
        }

        if let Some(server_id) = self.cli.server_id {
            config.server_id = server_id;
        }

        if self.cli.server_fallback {
            config.server_fallback = true;
        }

        if let Some(timeout) = self.cli.timeout {
            config.command_timeout_seconds = timeout;
        }

        if let Some(ref level) = self.cli.log_level {
            config.log_level = level.parse()?;
        }

        if let Some(ref format) = self.cli.log_format {
            config.log_format = format.parse()?;
        }

        if self.cli.no_color {
            config.enable_color = false;
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Configuration summary for debug logging
pub fn display_config_summary(config: &Config) -> String {
    [
        format!("Backend: {}", config.backend),
        format!("bbk binary: {}", config.bbk_binary_path.display()),
        format!("bbk timeout: {}s", config.command_timeout_seconds),
        format!("Server ID: {}", config.server_id),
        format!("Server fallback: {}", config.server_fallback),
        format!("HTTP timeout: {}s", config.http_timeout_seconds),
        format!("Log: {:?} / {:?}", config.log_level, config.log_format),
    ]
    .join("\n")
}
