//! Environment variable handling and .env file management

use crate::error::Result;
use std::path::Path;

/// Variables read by `Config::merge_from_env`
pub const ENV_VARS: &[&str] = &[
    "EXPORTER_BACKEND",
    "BBK_BINARY",
    "SPEEDTEST_SERVER_ID",
    "SPEEDTEST_SERVER_FALLBACK",
    "BBK_TIMEOUT_SECONDS",
    "SPEEDTEST_HTTP_TIMEOUT_SECONDS",
    "LOG_LEVEL",
    "LOG_FORMAT",
    "ENABLE_COLOR",
];

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load `.env` from the working directory if it exists.
    /// Returns whether a file was loaded.
    pub fn load_env_file() -> Result<bool> {
        Self::load_env_file_from(Path::new(".env"))
    }

    pub fn load_env_file_from(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        dotenv::from_path(path)?;
        Ok(true)
    }

    /// Example .env content documenting every supported variable
    pub fn create_example_env_content() -> String {
        r#"# Speedtest Exporter Configuration
#
# Values here are defaults; command-line arguments override them.

# Measurement backend: bbk or speedtest
# EXPORTER_BACKEND=bbk

# Path of the bbk binary
# BBK_BINARY=/usr/local/bin/bbk

# Deadline for one bbk invocation in seconds
# BBK_TIMEOUT_SECONDS=120

# speedtest.net server ID, -1 selects the nearest server
# SPEEDTEST_SERVER_ID=-1

# Accept the provider's server when the configured ID is not matched exactly
# SPEEDTEST_SERVER_FALLBACK=false

# Per-request timeout of the speedtest.net HTTP client in seconds
# SPEEDTEST_HTTP_TIMEOUT_SECONDS=60

# Logging: trace, debug, info, warn, error, fatal / console, compact, json
# LOG_LEVEL=info
# LOG_FORMAT=console
# ENABLE_COLOR=true
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_env_file_is_not_an_error() {
        let loaded = EnvManager::load_env_file_from(Path::new("/nonexistent/.env")).unwrap();
        assert!(!loaded);
    }

    #[test]
    fn test_load_env_file_sets_variables() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "SPEEDTEST_EXPORTER_ENV_TEST=loaded").unwrap();

        assert!(EnvManager::load_env_file_from(file.path()).unwrap());
        assert_eq!(std::env::var("SPEEDTEST_EXPORTER_ENV_TEST").unwrap(), "loaded");
    }

    #[test]
    fn test_example_documents_every_variable() {
        let content = EnvManager::create_example_env_content();
        for var in ENV_VARS {
            assert!(content.contains(var), "{} missing from example", var);
        }
    }
}
