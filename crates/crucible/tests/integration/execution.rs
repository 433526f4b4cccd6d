use std::time::Duration;

use crucible::config::Config;
use crucible::runner::{ExecuteError, ExecuteRequest, Runner};
use crucible::types::ExecutionStatus;

use super::{fixture_source, test_runner, workspace_count};

#[tokio::test]
async fn test_run_hello_python() {
    let (tmp, runner) = test_runner();

    let code = fixture_source("hello.py");
    let result = runner
        .execute(ExecuteRequest {
            code: &code,
            language: "python",
            stdin: None,
        })
        .await
        .expect("Execution failed");

    assert!(result.is_success());
    assert_eq!(result.status, ExecutionStatus::Ok);
    assert_eq!(result.exit_code, Some(0));
    assert!(result.stdout_lossy().contains("Hello, World!"));
    assert_eq!(workspace_count(tmp.path()), 0);
}

#[tokio::test]
async fn test_run_hello_javascript() {
    let (_tmp, runner) = test_runner();

    let code = fixture_source("hello.js");
    let result = runner
        .execute(ExecuteRequest {
            code: &code,
            language: "javascript",
            stdin: None,
        })
        .await
        .expect("Execution failed");

    assert!(result.is_success());
    assert!(result.stdout_lossy().contains("Hello, World!"));
}

#[tokio::test]
async fn test_run_with_stdin() {
    let (_tmp, runner) = test_runner();

    let code = fixture_source("echo.py");
    let result = runner
        .execute(ExecuteRequest {
            code: &code,
            language: "python",
            stdin: Some(b"test input\n"),
        })
        .await
        .expect("Execution failed");

    assert!(result.is_success());
    assert!(result.stdout_lossy().contains("test input"));
}

#[tokio::test]
async fn test_run_runtime_error() {
    let (tmp, runner) = test_runner();

    let code = fixture_source("runtime_error.py");
    let result = runner
        .execute(ExecuteRequest {
            code: &code,
            language: "python",
            stdin: None,
        })
        .await
        .expect("Execution call failed");

    assert!(!result.is_success());
    assert_eq!(result.status, ExecutionStatus::RuntimeError);
    assert_eq!(result.exit_code, Some(1));
    assert!(!result.stderr.is_empty());
    // The workspace must be gone on the failure path too
    assert_eq!(workspace_count(tmp.path()), 0);
}

#[tokio::test]
async fn test_run_deadline_kills_infinite_loop() {
    let tmp = tempfile::tempdir().unwrap();
    let config = Config {
        workspace_root: tmp.path().to_path_buf(),
        run_timeout_secs: 0.5,
        ..Config::default()
    };
    let runner = Runner::new(config);

    let code = fixture_source("infinite_loop.py");
    let start = std::time::Instant::now();
    let result = runner
        .execute(ExecuteRequest {
            code: &code,
            language: "python",
            stdin: None,
        })
        .await
        .expect("Execution call failed");

    assert_eq!(result.status, ExecutionStatus::TimedOut);
    assert!(result.exit_code.is_none());
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(workspace_count(tmp.path()), 0);
}

#[tokio::test]
async fn test_unsupported_language() {
    let (_tmp, runner) = test_runner();

    let result = runner
        .execute(ExecuteRequest {
            code: "print(1)",
            language: "fortran",
            stdin: None,
        })
        .await;

    match result {
        Err(ExecuteError::UnsupportedLanguage(id)) => assert_eq!(id, "fortran"),
        other => panic!("expected UnsupportedLanguage, got {other:?}"),
    }
}

#[tokio::test]
async fn test_language_lookup_is_case_insensitive() {
    let (_tmp, runner) = test_runner();

    let code = fixture_source("hello.py");
    let result = runner
        .execute(ExecuteRequest {
            code: &code,
            language: "Python",
            stdin: None,
        })
        .await
        .expect("Execution failed");

    assert!(result.is_success());
}

#[tokio::test]
async fn test_concurrent_runs_do_not_interfere() {
    let (tmp, runner) = test_runner();

    let mut handles = Vec::new();
    for i in 0..4 {
        let runner = runner.clone();
        handles.push(tokio::spawn(async move {
            let code = format!("print({i})");
            runner
                .execute(ExecuteRequest {
                    code: &code,
                    language: "python",
                    stdin: None,
                })
                .await
                .expect("Execution failed")
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.stdout_lossy().trim(), i.to_string());
    }

    assert_eq!(workspace_count(tmp.path()), 0);
}
