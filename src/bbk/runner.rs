//! Runs the bbk binary under a deadline and parses its summary line

use super::parser::parse_quiet_output;
use crate::error::RunError;
use crate::logging::Logger;
use crate::models::ParsedFields;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Flags forcing machine-readable, non-interactive output over TLS
pub const BBK_ARGS: &[&str] = &["--quiet", "--ssl"];

/// Captured stdout of one invocation
#[derive(Debug, Default)]
struct CapturedOutput {
    last_line: Option<String>,
    discarded_lines: usize,
}

/// Executes one bbk measurement per `run` call.
/// All per-run state lives on the stack of `run`.
#[derive(Debug, Clone)]
pub struct BbkRunner {
    binary_path: PathBuf,
    timeout: Duration,
    logger: Logger,
}

impl BbkRunner {
    pub fn new(binary_path: impl Into<PathBuf>, timeout: Duration, logger: Logger) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout,
            logger,
        }
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the binary and parse its last non-empty output line.
    ///
    /// The child is spawned with `kill_on_drop`, so when the deadline elapses
    /// the dropped future takes the process down with it.
    pub async fn run(&self, correlation_id: &str) -> Result<ParsedFields, RunError> {
        let output = match tokio::time::timeout(self.timeout, self.execute()).await {
            Ok(result) => result?,
            Err(_) => return Err(RunError::Timeout(self.timeout)),
        };

        if output.discarded_lines > 0 {
            self.logger
                .debug("Discarded earlier output lines")
                .correlation_id(correlation_id)
                .field("discarded_lines", output.discarded_lines)
                .log();
        }

        let line = output.last_line.ok_or(RunError::EmptyOutput)?;
        self.logger
            .trace("bbk summary line")
            .correlation_id(correlation_id)
            .field("line", &line)
            .log();

        Ok(parse_quiet_output(&line)?)
    }

    async fn execute(&self) -> Result<CapturedOutput, RunError> {
        crate::log_debug!(self.logger, "Spawning {} {}", self.binary_path.display(), BBK_ARGS.join(" "));
        let mut child = Command::new(&self.binary_path)
            .args(BBK_ARGS)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::StartFailure {
                path: self.binary_path.display().to_string(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| RunError::StartFailure {
            path: self.binary_path.display().to_string(),
            source: std::io::Error::other("stdout was not captured"),
        })?;
        let stderr = child.stderr.take();

        // Progress lines may carry non-UTF-8 server names, so read raw bytes
        let read_stdout = async {
            let mut captured = CapturedOutput::default();
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                if reader.read_until(b'\n', &mut buf).await? == 0 {
                    break;
                }
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if captured.last_line.replace(line.to_string()).is_some() {
                    captured.discarded_lines += 1;
                }
            }
            Ok::<_, std::io::Error>(captured)
        };

        let read_stderr = async {
            let mut buffer = String::new();
            if let Some(mut stderr) = stderr {
                stderr.read_to_string(&mut buffer).await?;
            }
            Ok::<_, std::io::Error>(buffer)
        };

        let (captured, stderr_text) = tokio::join!(read_stdout, read_stderr);
        let captured = captured.map_err(RunError::OutputRead)?;
        let stderr_text = stderr_text.unwrap_or_default();

        let status = child.wait().await.map_err(RunError::OutputRead)?;
        if !status.success() {
            return Err(RunError::NonZeroExit {
                status: status.to_string(),
                stderr: stderr_text.trim().to_string(),
            });
        }

        Ok(captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;

    fn quiet_logger() -> Logger {
        let mut logger = Logger::new("bbk");
        logger.set_level(LogLevel::Fatal);
        logger
    }

    #[tokio::test]
    async fn test_missing_binary_is_start_failure() {
        let runner = BbkRunner::new(
            "/nonexistent/path/to/bbk",
            Duration::from_secs(5),
            quiet_logger(),
        );
        let err = runner.run("test").await.unwrap_err();
        assert!(matches!(err, RunError::StartFailure { .. }), "got {err:?}");
        assert!(err.to_string().contains("/nonexistent/path/to/bbk"));
    }

    #[test]
    fn test_runner_accessors() {
        let runner = BbkRunner::new("bbk", Duration::from_secs(120), quiet_logger());
        assert_eq!(runner.binary_path(), Path::new("bbk"));
        assert_eq!(runner.timeout(), Duration::from_secs(120));
        assert_eq!(BBK_ARGS, &["--quiet", "--ssl"]);
    }
}
