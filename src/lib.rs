//! Speedtest Exporter
//!
//! Measures internet connection quality (latency, download and upload
//! throughput) through either the external `bbk` binary or the speedtest.net
//! server network, and maps each measurement onto a stable gauge schema for
//! pull-based monitoring.

pub mod bbk;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod speedtest;
pub mod units;

// Re-export commonly used types
pub use error::{AppError, ParseError, ProviderError, Result, RunError};
pub use metrics::{Collector, MetricBuffer, MetricDesc, MetricSink, Sample};
pub use models::{Backend, Config};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_BBK_BINARY: &str = "bbk";
    pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);
    pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);
    pub const MAX_TIMEOUT_SECS: u64 = 600;
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}

/// Build the collector selected by `config`
pub fn build_collector(config: &Config, logger: &logging::Logger) -> Result<Box<dyn Collector>> {
    match config.backend {
        Backend::Bbk => Ok(Box::new(bbk::BbkCollector::new(
            config.bbk_binary_path.clone(),
            config.command_timeout(),
            logger.named("bbk"),
        ))),
        Backend::Speedtest => {
            let provider = speedtest::HttpProvider::new(config.http_timeout())?;
            Ok(Box::new(speedtest::SpeedtestCollector::new(
                provider,
                config.server_selector(),
                config.server_fallback,
                logger.named("speedtest"),
            )))
        }
    }
}
