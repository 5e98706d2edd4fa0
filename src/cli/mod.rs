//! Command-line interface

use clap::Parser;
use std::path::PathBuf;

/// Speedtest Exporter - measure connection quality and print Prometheus metrics
#[derive(Parser, Debug, Clone)]
#[command(name = "speedtest-exporter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Measurement backend: bbk or speedtest
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Path of the bbk binary
    #[arg(long, value_name = "PATH")]
    pub bbk_binary: Option<PathBuf>,

    /// speedtest.net server ID (-1 selects the nearest server)
    #[arg(long, allow_hyphen_values = true)]
    pub server_id: Option<i64>,

    /// Use the provider's server when the configured ID is not matched exactly
    #[arg(long)]
    pub server_fallback: bool,

    /// Deadline in seconds for one bbk invocation
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Minimum log level (trace, debug, info, warn, error, fatal)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (console, compact, json)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,

    /// Print the metric descriptors without measuring
    #[arg(long)]
    pub describe: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["speedtest-exporter"]);
        assert!(cli.backend.is_none());
        assert!(cli.server_id.is_none());
        assert!(!cli.server_fallback);
        assert!(!cli.describe);
    }

    #[test]
    fn test_negative_server_id() {
        let cli = Cli::parse_from(["speedtest-exporter", "--server-id", "-1"]);
        assert_eq!(cli.server_id, Some(-1));
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::parse_from([
            "speedtest-exporter",
            "--backend",
            "speedtest",
            "--bbk-binary",
            "/usr/local/bin/bbk",
            "--server-id",
            "5001",
            "--server-fallback",
            "--timeout",
            "30",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "--no-color",
            "--describe",
        ]);
        assert_eq!(cli.backend.as_deref(), Some("speedtest"));
        assert_eq!(cli.bbk_binary, Some(PathBuf::from("/usr/local/bin/bbk")));
        assert_eq!(cli.server_id, Some(5001));
        assert!(cli.server_fallback);
        assert_eq!(cli.timeout, Some(30));
        assert!(cli.no_color && cli.describe);
    }
}
