//! External tool invocation behind a substitutable seam.
//!
//! The pipeline talks to its media binaries through [`ToolRunner`] so tests
//! can swap in deterministic fakes. The system implementation captures
//! combined stdout/stderr and enforces a wall-clock deadline: a hung tool
//! is killed rather than allowed to hold an admission slot forever.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// How often the runner polls a child for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub program: String,
    pub args: Vec<String>,
    /// Wall-clock deadline; the child is killed on expiry.
    pub timeout: Duration,
}

impl ToolRequest {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

/// Outcome of a tool invocation that ran to completion.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub exit_code: i32,
    /// Combined stdout and stderr text.
    pub combined: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors from the runner itself; a non-zero exit is reported through
/// [`ToolOutput`], not here, so callers can attach the combined output to
/// their own error kinds.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {limit:?} and was killed")]
    TimedOut { tool: String, limit: Duration },

    #[error("I/O error while running {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// Seam for invoking external tools.
pub trait ToolRunner: Send + Sync {
    fn run(&self, request: &ToolRequest) -> Result<ToolOutput, ToolError>;
}

/// Runner that spawns real processes.
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(&self, request: &ToolRequest) -> Result<ToolOutput, ToolError> {
        tracing::debug!(tool = %request.program, args = ?request.args, "running external tool");

        let mut child = Command::new(&request.program)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolError::Launch {
                tool: request.program.clone(),
                source: e,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| ToolError::Io {
            tool: request.program.clone(),
            source: std::io::Error::other("stdout not captured"),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| ToolError::Io {
            tool: request.program.clone(),
            source: std::io::Error::other("stderr not captured"),
        })?;

        // Drain both pipes off-thread so a chatty tool cannot deadlock
        // against a full pipe buffer while we poll for exit.
        let stdout_reader = thread::spawn(move || read_all(stdout));
        let stderr_reader = thread::spawn(move || read_all(stderr));

        let deadline = Instant::now() + request.timeout;
        let status = loop {
            let polled = child.try_wait().map_err(|e| ToolError::Io {
                tool: request.program.clone(),
                source: e,
            })?;
            match polled {
                Some(status) => break status,
                None => {
                    if Instant::now() >= deadline {
                        tracing::warn!(tool = %request.program, timeout_secs = request.timeout.as_secs(), "tool deadline expired, killing");
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = stdout_reader.join();
                        let _ = stderr_reader.join();
                        return Err(ToolError::TimedOut {
                            tool: request.program.clone(),
                            limit: request.timeout,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        };

        let mut combined = String::from_utf8_lossy(&stdout_reader.join().unwrap_or_default())
            .into_owned();
        combined.push_str(&String::from_utf8_lossy(
            &stderr_reader.join().unwrap_or_default(),
        ));
        let combined = combined.trim().to_string();

        let exit_code = status.code().unwrap_or(-1);
        tracing::debug!(tool = %request.program, exit_code, "tool finished");

        Ok(ToolOutput {
            exit_code,
            combined,
        })
    }
}

fn read_all(mut source: impl Read) -> Vec<u8> {
    let mut buffer = Vec::new();
    let _ = source.read_to_end(&mut buffer);
    buffer
}

/// Locate a program on `PATH`, for startup dependency checks.
pub fn locate(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn captures_combined_output_and_exit_code() {
        let request = ToolRequest::new(
            "sh",
            vec![
                "-c".to_string(),
                "echo out; echo err 1>&2".to_string(),
            ],
            Duration::from_secs(5),
        );

        let output = SystemToolRunner.run(&request).unwrap();
        assert!(output.success());
        assert!(output.combined.contains("out"));
        assert!(output.combined.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn reports_nonzero_exit_through_output() {
        let request = ToolRequest::new(
            "sh",
            vec!["-c".to_string(), "exit 3".to_string()],
            Duration::from_secs(5),
        );

        let output = SystemToolRunner.run(&request).unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, 3);
    }

    #[cfg(unix)]
    #[test]
    fn kills_child_past_deadline() {
        let request = ToolRequest::new(
            "sh",
            vec!["-c".to_string(), "sleep 30".to_string()],
            Duration::from_millis(200),
        );

        let started = Instant::now();
        let result = SystemToolRunner.run(&request);

        assert!(matches!(result, Err(ToolError::TimedOut { .. })));
        // The child was killed; we did not wait out the sleep.
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn launch_failure_names_the_tool() {
        let request = ToolRequest::new(
            "definitely-not-a-real-binary-xyz",
            vec![],
            Duration::from_secs(1),
        );

        let err = SystemToolRunner.run(&request).unwrap_err();
        assert!(err.to_string().contains("definitely-not-a-real-binary-xyz"));
    }
}
