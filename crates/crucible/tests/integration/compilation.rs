use crucible::runner::ExecuteRequest;
use crucible::types::ExecutionStatus;

use super::{fixture_source, test_runner, workspace_count};

#[tokio::test]
async fn test_compile_and_run_c() {
    let (tmp, runner) = test_runner();

    let code = fixture_source("hello.c");
    let result = runner
        .execute(ExecuteRequest {
            code: &code,
            language: "c",
            stdin: None,
        })
        .await
        .expect("Execution failed");

    assert!(result.is_success());
    assert!(result.stdout_lossy().contains("Hello, World!"));
    // Source and binary are both gone
    assert_eq!(workspace_count(tmp.path()), 0);
}

#[tokio::test]
async fn test_compile_and_run_cpp() {
    let (_tmp, runner) = test_runner();

    let code = fixture_source("hello.cpp");
    let result = runner
        .execute(ExecuteRequest {
            code: &code,
            language: "cpp",
            stdin: None,
        })
        .await
        .expect("Execution failed");

    assert!(result.is_success());
    assert!(result.stdout_lossy().contains("Hello, World!"));
}

#[tokio::test]
async fn test_compile_and_run_java() {
    let (_tmp, runner) = test_runner();

    let code = fixture_source("Main.java");
    let result = runner
        .execute(ExecuteRequest {
            code: &code,
            language: "java",
            stdin: None,
        })
        .await
        .expect("Execution failed");

    assert!(result.is_success());
    assert!(result.stdout_lossy().contains("Hello, World!"));
}

#[tokio::test]
async fn test_compile_failure_reported_like_runtime_failure() {
    let (tmp, runner) = test_runner();

    let code = fixture_source("compile_error.c");
    let result = runner
        .execute(ExecuteRequest {
            code: &code,
            language: "c",
            stdin: None,
        })
        .await
        .expect("Execution call failed");

    // A build failure comes back as a non-zero exit with compiler stderr,
    // the same shape as a runtime failure. The program never runs.
    assert!(!result.is_success());
    assert_eq!(result.status, ExecutionStatus::RuntimeError);
    assert!(result.exit_code.map(|c| c != 0).unwrap_or(true));
    assert!(!result.stderr.is_empty());
    assert!(result.stdout.is_empty());
    assert_eq!(workspace_count(tmp.path()), 0);
}

#[tokio::test]
async fn test_compiled_run_with_stdin() {
    let (_tmp, runner) = test_runner();

    let code = fixture_source("echo.c");
    let result = runner
        .execute(ExecuteRequest {
            code: &code,
            language: "c",
            stdin: Some(b"roundtrip\n"),
        })
        .await
        .expect("Execution failed");

    assert!(result.is_success());
    assert!(result.stdout_lossy().contains("roundtrip"));
}
