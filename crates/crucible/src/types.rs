use std::process::ExitStatus;

use serde::{Deserialize, Serialize};

/// Status of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Program exited with code 0
    #[serde(rename = "ok")]
    Ok,

    /// Program exited with a non-zero code
    #[serde(rename = "runtime_error")]
    RuntimeError,

    /// Program exceeded its wall-clock deadline and was killed
    #[serde(rename = "timed_out")]
    TimedOut,

    /// Program was killed by a signal
    #[serde(rename = "signaled")]
    Signaled,
}

/// Result of running a program to completion
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Execution status
    pub status: ExecutionStatus,

    /// Exit code if the program exited normally
    pub exit_code: Option<i32>,

    /// Signal number if the program was killed by a signal
    pub signal: Option<i32>,

    /// Captured standard output
    pub stdout: Vec<u8>,

    /// Captured standard error
    pub stderr: Vec<u8>,
}

impl ExecutionResult {
    /// Build a result from a child's exit status
    pub fn from_exit_status(status: ExitStatus) -> Self {
        let exit_code = status.code();
        let signal = exit_signal(&status);

        let status = match exit_code {
            Some(0) => ExecutionStatus::Ok,
            Some(_) => ExecutionStatus::RuntimeError,
            None => ExecutionStatus::Signaled,
        };

        Self {
            status,
            exit_code,
            signal,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    /// Build a result for a process that was killed on deadline expiry
    pub fn timed_out() -> Self {
        Self {
            status: ExecutionStatus::TimedOut,
            exit_code: None,
            signal: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    /// Check if the execution was successful (exited with code 0)
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Ok) && self.exit_code == Some(0)
    }

    /// Standard output decoded as UTF-8, lossily
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard error decoded as UTF-8, lossily
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self {
            status: ExecutionStatus::Ok,
            exit_code: None,
            signal: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
