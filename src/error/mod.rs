//! Error handling for the speedtest exporter

use std::time::Duration;
use thiserror::Error;

/// Application-level errors (configuration, bootstrap, rendering)
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (writing the exposition)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (log levels and formats)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Network(_) => "NETWORK",
            Self::Timeout(_) => "TIMEOUT",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,
            Self::Network(_) => 2,
            Self::Timeout(_) => 3,
            Self::Io(_) => 5,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Network(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<ProviderError> for AppError {
    fn from(error: ProviderError) -> Self {
        match &error {
            ProviderError::Http(e) if e.is_timeout() => Self::timeout(error.to_string()),
            _ => Self::network(error.to_string()),
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<prometheus::Error> for AppError {
    fn from(error: prometheus::Error) -> Self {
        Self::internal(format!("Metric encoding error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Malformed output from the bbk binary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("too few fields: expected at least 5, got {found} in {line:?}")]
    TooFewFields { found: usize, line: String },

    #[error("invalid numeric field {field}: {value:?} ({source})")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}

impl ParseError {
    /// Short machine-friendly reason
    pub fn reason(&self) -> &'static str {
        match self {
            Self::TooFewFields { .. } => "too few fields",
            Self::InvalidNumber { .. } => "invalid numeric field",
        }
    }
}

/// Failures of a measurement provider call (network, decoding, sub-tests)
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("could not decode provider response: {0}")]
    Decode(String),

    #[error("no candidate servers to search")]
    NoCandidates,

    #[error("{0}")]
    Measurement(String),
}

/// Failures of one measurement cycle
#[derive(Error, Debug)]
pub enum RunError {
    #[error("measurement did not complete within {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("failed to start {path}: {source}")]
    StartFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command exited with {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },

    #[error("failed to read command output: {0}")]
    OutputRead(#[source] std::io::Error),

    #[error("no output from measurement")]
    EmptyOutput,

    #[error("unexpected output format: {0}")]
    ParseFailure(#[from] ParseError),

    #[error("could not fetch user information: {0}")]
    UserInfoFailure(#[source] ProviderError),

    #[error("could not fetch server list: {0}")]
    NoServers(String),

    #[error("server lookup for ID {id} failed: {source}")]
    ServerLookupFailure {
        id: i64,
        #[source]
        source: ProviderError,
    },

    #[error("could not find server ID {0} in the list of available servers")]
    ServerNotFound(i64),

    #[error("provider returned server ID {returned} for requested ID {requested} and server fallback is not set")]
    ServerMismatch { requested: i64, returned: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_error = AppError::config("Invalid configuration");
        assert_eq!(config_error.category(), "CONFIG");
        assert_eq!(config_error.exit_code(), 1);

        let network_error = AppError::network("Connection failed");
        assert_eq!(network_error.category(), "NETWORK");
        assert_eq!(network_error.exit_code(), 2);
    }

    #[test]
    fn test_error_display() {
        let error = AppError::config("Test configuration error");
        let display = error.to_string();
        assert!(display.contains("Configuration error"));
        assert!(display.contains("Test configuration error"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("test").exit_code(), 1);
        assert_eq!(AppError::network("test").exit_code(), 2);
        assert_eq!(AppError::timeout("test").exit_code(), 3);
        assert_eq!(AppError::io("test").exit_code(), 5);
        assert_eq!(AppError::internal("test").exit_code(), 99);
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.category(), "IO");

        let provider_error = ProviderError::Status {
            url: "http://example.net".into(),
            status: 503,
        };
        let app_error: AppError = provider_error.into();
        assert_eq!(app_error.category(), "NETWORK");
        assert!(app_error.to_string().contains("503"));

        let app_error: AppError = prometheus::Error::Msg("duplicate family".into()).into();
        assert_eq!(app_error.category(), "INTERNAL");
        assert!(app_error.to_string().contains("duplicate family"));
    }

    #[test]
    fn test_console_formatting() {
        let error = AppError::validation("bad label count");
        assert_eq!(
            error.format_for_console(false),
            "[VALIDATION] Validation error: bad label count"
        );
        assert!(error.format_for_console(true).contains("bad label count"));
    }

    #[test]
    fn test_parse_error_reasons() {
        let too_few = ParseError::TooFewFields { found: 2, line: "1 2".into() };
        assert_eq!(too_few.reason(), "too few fields");

        let invalid = ParseError::InvalidNumber {
            field: "download",
            value: "abc".into(),
            source: "abc".parse::<f64>().unwrap_err(),
        };
        assert_eq!(invalid.reason(), "invalid numeric field");
        assert!(invalid.to_string().contains("\"abc\""));
    }

    #[test]
    fn test_run_error_wraps_parse_error() {
        let run_error: RunError = ParseError::TooFewFields { found: 0, line: String::new() }.into();
        assert!(matches!(run_error, RunError::ParseFailure(_)));
        assert!(run_error.to_string().starts_with("unexpected output format"));
    }

    #[test]
    fn test_timeout_display() {
        let error = RunError::Timeout(Duration::from_millis(1500));
        assert_eq!(error.to_string(), "measurement did not complete within 1.5s");
    }
}
