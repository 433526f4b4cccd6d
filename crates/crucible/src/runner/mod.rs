//! Code runner for Crucible
//!
//! Provides the high-level APIs for executing code: buffered one-shot
//! execution and interactive streaming sessions.

use thiserror::Error;

pub use crate::runner::session::{
    SessionError, SessionEvent, SessionEventStream, SessionHandle,
};

mod execute;
mod session;

use crate::{
    config::{Config, Language},
    process::ProcessError,
    types::ExecutionResult,
    workspace::{WorkspaceError, WorkspaceRoot},
};

/// Request for one execution attempt
#[derive(Debug)]
pub struct ExecuteRequest<'a> {
    /// Source code to run
    pub code: &'a str,
    /// Language identifier (case-insensitive)
    pub language: &'a str,
    /// Optional complete stdin payload, written before the input stream closes
    pub stdin: Option<&'a [u8]>,
}

/// Errors that occur before or while driving an execution
///
/// Build and runtime failures are not errors at this level: they come back
/// inside [`ExecutionResult`] as a non-zero exit code plus captured stderr,
/// without distinguishing which phase failed.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("no code provided")]
    EmptyCode,

    #[error("no language provided")]
    EmptyLanguage,

    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// High-level runner for code execution
#[derive(Debug, Clone)]
pub struct Runner {
    config: Config,
    workspaces: WorkspaceRoot,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        let workspaces = WorkspaceRoot::new(&config.workspace_root);
        Self { config, workspaces }
    }

    /// Create a new runner with default configuration
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve and validate a request's language before any side effect
    fn resolve(&self, code: &str, language: &str) -> Result<&Language, ExecuteError> {
        if code.is_empty() {
            return Err(ExecuteError::EmptyCode);
        }
        if language.is_empty() {
            return Err(ExecuteError::EmptyLanguage);
        }
        self.config
            .get_language(language)
            .map_err(|_| ExecuteError::UnsupportedLanguage(language.to_string()))
    }

    /// Run a program with batch I/O, returning once it exits.
    ///
    /// Resolves the language, allocates a workspace, builds if the language
    /// is compiled, runs with the optional stdin payload, and releases the
    /// workspace on every path.
    pub async fn execute(
        &self,
        request: ExecuteRequest<'_>,
    ) -> Result<ExecutionResult, ExecuteError> {
        execute::execute(self, request).await
    }

    /// Start an interactive streaming session.
    ///
    /// Provisioning failures (unknown language, workspace write, process
    /// spawn) fail outward; once this returns, all further output arrives as
    /// [`SessionEvent`]s ending in exactly one
    /// [`SessionEvent::Exited`], after which the workspace has been
    /// released.
    pub async fn start_session(
        &self,
        code: &str,
        language: &str,
    ) -> Result<(SessionEventStream, SessionHandle), ExecuteError> {
        session::start_session(self, code, language).await
    }

    pub(crate) fn workspaces(&self) -> &WorkspaceRoot {
        &self.workspaces
    }
}
