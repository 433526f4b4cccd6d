//! Interactive streaming sessions
//!
//! A session binds one run to one workspace and one supervised process. A
//! background task forwards the child's stdout/stderr chunks as events in
//! arrival order, relays stdin writes in send order, and delivers exactly
//! one exit event after the workspace has been released.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::sync::{Notify, mpsc, watch};
use tracing::{debug, warn};

use crate::process::{SupervisedProcess, run_batch};
use crate::runner::{ExecuteError, Runner};
use crate::types::ExecutionResult;
use crate::workspace::Workspace;

const READ_BUF_SIZE: usize = 4096;

/// Event from a streaming session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Data received on stdout
    Stdout(Vec<u8>),

    /// Data received on stderr
    Stderr(Vec<u8>),

    /// The process exited; delivered exactly once, after artifact release
    Exited(ExecutionResult),
}

/// Errors from session handle operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already terminated")]
    Terminated,
}

enum StdinCommand {
    Write(Vec<u8>),
    Close,
}

/// Receiving side of a session: ordered events until `Exited`
pub struct SessionEventStream {
    rx: mpsc::Receiver<SessionEvent>,
    _task: tokio::task::JoinHandle<()>,
}

impl SessionEventStream {
    /// Receive the next event
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }
}

/// Handle for controlling a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    stdin_tx: mpsc::Sender<StdinCommand>,
    kill: Arc<Notify>,
    done: watch::Receiver<bool>,
}

impl SessionHandle {
    /// Forward data to the process stdin, in send order
    pub async fn write_stdin(&self, data: &[u8]) -> Result<(), SessionError> {
        self.stdin_tx
            .send(StdinCommand::Write(data.to_vec()))
            .await
            .map_err(|_| SessionError::Terminated)
    }

    /// Close the process stdin to signal EOF
    pub async fn close_stdin(&self) -> Result<(), SessionError> {
        self.stdin_tx
            .send(StdinCommand::Close)
            .await
            .map_err(|_| SessionError::Terminated)
    }

    /// Request termination of the process. Idempotent.
    pub fn kill(&self) {
        self.kill.notify_one();
    }

    /// Wait until the session has fully torn down (process reaped,
    /// workspace released, exit event emitted).
    pub async fn wait_closed(&mut self) {
        // If the sender side is gone the current value is final.
        let _ = self.done.wait_for(|done| *done).await;
    }

    /// Kill the process and wait for teardown to complete.
    ///
    /// Synchronous enough that a follow-up start on the same connection
    /// cannot race with this session's cleanup.
    pub async fn kill_and_wait(&mut self) {
        self.kill();
        self.wait_closed().await;
    }

    /// Check whether the session has already terminated
    pub fn is_closed(&self) -> bool {
        *self.done.borrow()
    }
}

impl std::fmt::Debug for StdinCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StdinCommand::Write(data) => f.debug_tuple("Write").field(&data.len()).finish(),
            StdinCommand::Close => f.write_str("Close"),
        }
    }
}

pub(crate) async fn start_session(
    runner: &Runner,
    code: &str,
    language_id: &str,
) -> Result<(SessionEventStream, SessionHandle), ExecuteError> {
    let language = runner.resolve(code, language_id)?;
    let config = runner.config();

    let mut workspace = runner.workspaces().allocate(language, code.as_bytes()).await?;

    // Build step runs buffered before streaming starts. A failed build
    // ends the session immediately with the compiler's exit code and
    // stderr, the same shape a runtime failure has.
    if let Some(build_cmd) = language.build_command() {
        let build = match run_batch(
            &build_cmd,
            workspace.dir(),
            None,
            config.compile_timeout(language),
        )
        .await
        {
            Ok(build) => build,
            Err(e) => {
                workspace.release().await;
                return Err(e.into());
            }
        };

        if !build.is_success() {
            workspace.release().await;
            return Ok(completed_session(build));
        }
    }

    let run_cmd = language.run_command();
    let process = match SupervisedProcess::spawn(&run_cmd, workspace.dir()) {
        Ok(process) => process,
        Err(e) => {
            workspace.release().await;
            return Err(e.into());
        }
    };

    Ok(spawn_session(
        process,
        workspace,
        config.run_timeout(language),
    ))
}

/// Session for a run that already finished (failed build): emits the
/// captured stderr and the exit event, nothing else.
fn completed_session(result: ExecutionResult) -> (SessionEventStream, SessionHandle) {
    let (event_tx, event_rx) = mpsc::channel(16);
    let (_stdin_tx, _) = mpsc::channel::<StdinCommand>(1);
    let kill = Arc::new(Notify::new());
    let (done_tx, done_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        if !result.stderr.is_empty() {
            let _ = event_tx
                .send(SessionEvent::Stderr(result.stderr.clone()))
                .await;
        }
        let _ = event_tx.send(SessionEvent::Exited(result)).await;
        let _ = done_tx.send(true);
    });

    let stream = SessionEventStream {
        rx: event_rx,
        _task: task,
    };
    let handle = SessionHandle {
        stdin_tx: _stdin_tx,
        kill,
        done: done_rx,
    };

    (stream, handle)
}

/// Spawn the session task that owns the process and workspace.
///
/// The task multiplexes stdin writes, stdout/stderr reads, the kill
/// signal, and the wall-clock deadline. It always releases the workspace
/// before emitting `Exited` and signalling completion.
fn spawn_session(
    mut process: SupervisedProcess,
    mut workspace: Workspace,
    deadline: Duration,
) -> (SessionEventStream, SessionHandle) {
    let (event_tx, event_rx) = mpsc::channel(100);
    let (stdin_tx, mut stdin_rx) = mpsc::channel::<StdinCommand>(100);
    let kill = Arc::new(Notify::new());
    let kill_signal = kill.clone();
    let (done_tx, done_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut stdout = process.take_stdout();
        let mut stderr = process.take_stderr();
        let mut stdout_buf = vec![0u8; READ_BUF_SIZE];
        let mut stderr_buf = vec![0u8; READ_BUF_SIZE];
        let mut stdout_closed = stdout.is_none();
        let mut stderr_closed = stderr.is_none();
        let mut stdin_open = true;
        let mut timed_out = false;
        let mut killed = false;

        let expiry = tokio::time::sleep(deadline);
        tokio::pin!(expiry);

        while !(stdout_closed && stderr_closed) {
            tokio::select! {
                biased;

                // Explicit cancel: kill, then fall through to teardown
                _ = kill_signal.notified() => {
                    debug!("session kill requested");
                    if let Err(e) = process.kill().await {
                        warn!(?e, "failed to kill process");
                    }
                    killed = true;
                    break;
                }

                // Wall-clock deadline: forced kill
                _ = &mut expiry => {
                    warn!(?deadline, "session deadline expired, killing process");
                    if let Err(e) = process.kill().await {
                        warn!(?e, "failed to kill process");
                    }
                    timed_out = true;
                    break;
                }

                // Relay stdin in send order
                cmd = stdin_rx.recv(), if stdin_open => {
                    match cmd {
                        Some(StdinCommand::Write(data)) => {
                            if let Err(e) = process.write(&data).await {
                                warn!(?e, "failed to write to stdin");
                                stdin_open = false;
                            }
                        }
                        Some(StdinCommand::Close) | None => {
                            process.close_stdin();
                            stdin_open = false;
                        }
                    }
                }

                result = read_chunk(&mut stdout, &mut stdout_buf), if !stdout_closed => {
                    match result {
                        Ok(0) => stdout_closed = true,
                        Ok(n) => {
                            let _ = event_tx
                                .send(SessionEvent::Stdout(stdout_buf[..n].to_vec()))
                                .await;
                        }
                        Err(e) => {
                            warn!(?e, "stdout read error");
                            stdout_closed = true;
                        }
                    }
                }

                result = read_chunk(&mut stderr, &mut stderr_buf), if !stderr_closed => {
                    match result {
                        Ok(0) => stderr_closed = true,
                        Ok(n) => {
                            let _ = event_tx
                                .send(SessionEvent::Stderr(stderr_buf[..n].to_vec()))
                                .await;
                        }
                        Err(e) => {
                            warn!(?e, "stderr read error");
                            stderr_closed = true;
                        }
                    }
                }
            }
        }

        // Streams at EOF do not mean the child exited: it may have closed
        // its output and kept running. The kill signal and the deadline
        // stay live until the process is actually reaped.
        let status = loop {
            tokio::select! {
                biased;

                _ = kill_signal.notified(), if !killed => {
                    debug!("session kill requested");
                    if let Err(e) = process.kill().await {
                        warn!(?e, "failed to kill process");
                    }
                    killed = true;
                }

                _ = &mut expiry, if !timed_out && !killed => {
                    warn!(?deadline, "session deadline expired, killing process");
                    if let Err(e) = process.kill().await {
                        warn!(?e, "failed to kill process");
                    }
                    timed_out = true;
                }

                status = process.wait() => break status,
            }
        };

        let result = match status {
            Ok(_) if timed_out => ExecutionResult::timed_out(),
            Ok(result) => result,
            Err(e) => {
                warn!(?e, "failed to reap process");
                ExecutionResult::timed_out()
            }
        };

        // Artifacts are gone before anyone observes the exit
        workspace.release().await;

        let _ = event_tx.send(SessionEvent::Exited(result)).await;
        let _ = done_tx.send(true);
    });

    let stream = SessionEventStream {
        rx: event_rx,
        _task: task,
    };
    let handle = SessionHandle {
        stdin_tx,
        kill,
        done: done_rx,
    };

    (stream, handle)
}

async fn read_chunk<R: AsyncReadExt + Unpin>(
    reader: &mut Option<R>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match reader {
        Some(r) => r.read(buf).await,
        None => Ok(0),
    }
}
