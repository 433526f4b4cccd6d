//! Process supervision
//!
//! Spawns language toolchain and runtime processes, wires their standard
//! streams, and reports completion. Two modes: batch (collect everything
//! until exit) and supervised (streaming handle for interactive sessions).

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, instrument, warn};

use crate::types::ExecutionResult;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn build_command(argv: &[String], dir: &Path) -> Result<Command, ProcessError> {
    let program = argv.first().ok_or(ProcessError::EmptyCommand)?;
    let mut command = Command::new(program);
    command
        .args(&argv[1..])
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    Ok(command)
}

/// Run a command to completion with batch I/O
///
/// The optional stdin payload is written up front and the input stream is
/// closed; stdout and stderr are accumulated until exit. If the deadline
/// expires first the child is killed and the result is
/// [`ExecutionStatus::TimedOut`](crate::types::ExecutionStatus::TimedOut).
#[instrument(skip(stdin_data, deadline))]
pub async fn run_batch(
    argv: &[String],
    dir: &Path,
    stdin_data: Option<&[u8]>,
    deadline: Duration,
) -> Result<ExecutionResult, ProcessError> {
    let mut command = build_command(argv, dir)?;

    debug!(?argv, "running batch command");

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: argv[0].clone(),
        source,
    })?;

    // Write the complete stdin payload before waiting, then close the
    // stream so the child sees EOF.
    if let Some(mut stdin) = child.stdin.take() {
        if let Some(data) = stdin_data {
            stdin.write_all(data).await?;
        }
        stdin.shutdown().await?;
    }

    match tokio::time::timeout(deadline, child.wait_with_output()).await {
        Ok(output) => {
            let output = output?;
            let mut result = ExecutionResult::from_exit_status(output.status);
            result.stdout = output.stdout;
            result.stderr = output.stderr;

            debug!(
                status = ?result.status,
                exit_code = ?result.exit_code,
                "batch command complete"
            );
            Ok(result)
        }
        Err(_) => {
            // Dropping the wait future drops the child handle, which kills
            // the process (kill_on_drop).
            warn!(?argv, ?deadline, "deadline expired, child killed");
            Ok(ExecutionResult::timed_out())
        }
    }
}

/// Handle for a supervised streaming process
#[derive(Debug)]
pub struct SupervisedProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl SupervisedProcess {
    /// Spawn a new supervised process with piped standard streams
    #[instrument]
    pub fn spawn(argv: &[String], dir: &Path) -> Result<Self, ProcessError> {
        let mut command = build_command(argv, dir)?;

        debug!(?argv, "spawning supervised process");

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: argv[0].clone(),
            source,
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        Ok(Self {
            child,
            stdin,
            stdout,
            stderr,
        })
    }

    /// Write to the process stdin
    pub async fn write(&mut self, data: &[u8]) -> Result<(), ProcessError> {
        if let Some(ref mut stdin) = self.stdin {
            stdin.write_all(data).await?;
            stdin.flush().await?;
            Ok(())
        } else {
            Err(ProcessError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stdin closed",
            )))
        }
    }

    /// Close stdin to signal EOF
    pub fn close_stdin(&mut self) {
        self.stdin = None;
    }

    /// Take ownership of stdout
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Take ownership of stderr
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Kill the process
    ///
    /// Idempotent: killing a process that has already exited is a no-op.
    pub async fn kill(&mut self) -> Result<(), ProcessError> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        self.child.kill().await?;
        Ok(())
    }

    /// Wait for the process to exit and get the result.
    ///
    /// Closes stdin to signal EOF. Cancel safe, so it can race a kill
    /// signal in a `select!` and be retried.
    pub async fn wait(&mut self) -> Result<ExecutionResult, ProcessError> {
        self.stdin = None;

        let status = self.child.wait().await?;
        Ok(ExecutionResult::from_exit_status(status))
    }
}
