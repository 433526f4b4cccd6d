//! Buffered execution
//!
//! Drives one execution attempt to completion: materialize the source,
//! build if needed, run with the optional stdin payload, and release the
//! workspace whatever happens.

use tracing::{debug, instrument};

use crate::config::{Config, Language};
use crate::process::run_batch;
use crate::runner::{ExecuteError, ExecuteRequest, Runner};
use crate::types::ExecutionResult;
use crate::workspace::Workspace;

#[instrument(skip(runner, request), fields(language = request.language))]
pub(crate) async fn execute(
    runner: &Runner,
    request: ExecuteRequest<'_>,
) -> Result<ExecutionResult, ExecuteError> {
    // Resolve before any filesystem or process action
    let language = runner.resolve(request.code, request.language)?;

    let mut workspace = runner
        .workspaces()
        .allocate(language, request.code.as_bytes())
        .await?;

    let result = run_in_workspace(runner.config(), language, &workspace, request.stdin).await;

    // Release on every path: success, build failure, runtime failure,
    // spawn failure.
    workspace.release().await;

    result
}

async fn run_in_workspace(
    config: &Config,
    language: &Language,
    workspace: &Workspace,
    stdin: Option<&[u8]>,
) -> Result<ExecutionResult, ExecuteError> {
    // Build step for compiled languages. A failed build is reported with
    // the same shape as a runtime failure: the process's exit code and
    // captured stderr.
    if let Some(build_cmd) = language.build_command() {
        let build = run_batch(
            &build_cmd,
            workspace.dir(),
            None,
            config.compile_timeout(language),
        )
        .await?;

        if !build.is_success() {
            debug!(exit_code = ?build.exit_code, "build failed");
            return Ok(build);
        }
    }

    let run_cmd = language.run_command();
    let result = run_batch(&run_cmd, workspace.dir(), stdin, config.run_timeout(language)).await?;

    debug!(
        status = ?result.status,
        exit_code = ?result.exit_code,
        "execution complete"
    );

    Ok(result)
}
