use std::time::Duration;

use crucible::registry::SessionRegistry;
use crucible::types::ExecutionStatus;
use crucible::SessionEvent;
use uuid::Uuid;

use super::{drain_session, fixture_source, test_runner, workspace_count};

#[tokio::test]
async fn test_interactive_echo() {
    let (tmp, runner) = test_runner();

    let code = fixture_source("echo.py");
    let (mut events, handle) = runner
        .start_session(&code, "python")
        .await
        .expect("Failed to start session");

    handle.write_stdin(b"hello interactive\n").await.unwrap();

    // First output chunk must carry the echoed line
    let mut stdout = Vec::new();
    while !stdout.ends_with(b"hello interactive\n") {
        match events.recv().await {
            Some(SessionEvent::Stdout(chunk)) => stdout.extend_from_slice(&chunk),
            Some(SessionEvent::Stderr(_)) => {}
            other => panic!("unexpected event before echo: {other:?}"),
        }
    }

    handle.close_stdin().await.unwrap();

    let (_rest, _stderr, result) = drain_session(&mut events).await;
    assert!(result.is_success());
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(workspace_count(tmp.path()), 0);
}

#[tokio::test]
async fn test_interactive_multi_turn() {
    let (_tmp, runner) = test_runner();

    let code = fixture_source("adder.py");
    let (mut events, handle) = runner
        .start_session(&code, "python")
        .await
        .expect("Failed to start session");

    let mut stdout = Vec::new();
    for (a, b, expected) in [(1, 2, 3), (10, 20, 30), (-5, 15, 10)] {
        handle
            .write_stdin(format!("{a} {b}\n").as_bytes())
            .await
            .unwrap();

        let want = format!("{expected}\n");
        while !String::from_utf8_lossy(&stdout).contains(&want) {
            match events.recv().await {
                Some(SessionEvent::Stdout(chunk)) => stdout.extend_from_slice(&chunk),
                Some(SessionEvent::Stderr(chunk)) => {
                    panic!("stderr: {}", String::from_utf8_lossy(&chunk))
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        stdout.clear();
    }

    handle.close_stdin().await.unwrap();
    let (_stdout, _stderr, result) = drain_session(&mut events).await;
    assert!(result.is_success());
}

#[tokio::test]
async fn test_interactive_stderr_forwarded() {
    let (_tmp, runner) = test_runner();

    let code = fixture_source("runtime_error.py");
    let (mut events, _handle) = runner
        .start_session(&code, "python")
        .await
        .expect("Failed to start session");

    let (_stdout, stderr, result) = drain_session(&mut events).await;
    assert!(!result.is_success());
    assert_eq!(result.exit_code, Some(1));
    assert!(!stderr.is_empty());
}

#[tokio::test]
async fn test_kill_ends_session() {
    let (tmp, runner) = test_runner();

    let code = fixture_source("infinite_loop.py");
    let (mut events, mut handle) = runner
        .start_session(&code, "python")
        .await
        .expect("Failed to start session");

    handle.kill_and_wait().await;
    assert!(handle.is_closed());

    let (_stdout, _stderr, result) = drain_session(&mut events).await;
    assert!(!result.is_success());
    // Teardown has already released the workspace
    assert_eq!(workspace_count(tmp.path()), 0);
}

#[tokio::test]
async fn test_deadline_kills_session() {
    let tmp = tempfile::tempdir().unwrap();
    let config = crucible::Config {
        workspace_root: tmp.path().to_path_buf(),
        run_timeout_secs: 0.5,
        ..crucible::Config::default()
    };
    let runner = crucible::Runner::new(config);

    let code = fixture_source("infinite_loop.py");
    let start = std::time::Instant::now();
    let (mut events, _handle) = runner
        .start_session(&code, "python")
        .await
        .expect("Failed to start session");

    let (_stdout, _stderr, result) = drain_session(&mut events).await;
    assert_eq!(result.status, ExecutionStatus::TimedOut);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(workspace_count(tmp.path()), 0);
}

#[tokio::test]
async fn test_compile_failure_session_emits_stderr_then_exit() {
    let (tmp, runner) = test_runner();

    let code = fixture_source("compile_error.c");
    let (mut events, _handle) = runner
        .start_session(&code, "c")
        .await
        .expect("Failed to start session");

    let (stdout, stderr, result) = drain_session(&mut events).await;
    assert!(stdout.is_empty());
    assert!(!stderr.is_empty());
    assert!(!result.is_success());
    assert_eq!(workspace_count(tmp.path()), 0);
}

#[tokio::test]
async fn test_registry_replace_kills_previous() {
    let (tmp, runner) = test_runner();
    let registry = SessionRegistry::new();
    let connection = Uuid::new_v4();

    let code = fixture_source("infinite_loop.py");

    let (mut first_events, first) = runner.start_session(&code, "python").await.unwrap();
    registry.replace(connection, first).await;

    let (mut second_events, second) = runner.start_session(&code, "python").await.unwrap();
    registry.replace(connection, second).await;

    // The first session is dead and its workspace is gone; only the
    // second session's workspace remains.
    let (_stdout, _stderr, result) = drain_session(&mut first_events).await;
    assert!(!result.is_success());
    assert_eq!(workspace_count(tmp.path()), 1);

    registry.remove(connection).await;
    let (_stdout, _stderr, _result) = drain_session(&mut second_events).await;
    assert_eq!(workspace_count(tmp.path()), 0);
}
