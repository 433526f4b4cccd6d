//! HTTP and WebSocket routes for the crucible server.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::{IntoResponse, Json},
    routing::{get, post},
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};
use uuid::Uuid;

use crucible::{ExecuteRequest, ExecutionStatus, Runner, SessionEvent, SessionRegistry};

use crate::error::ApiError;
use crate::protocol::{ClientMessage, ServerMessage};

/// Application state shared across handlers.
pub struct AppState {
    /// Runner that executes submitted code.
    pub runner: Runner,
    /// Live interactive sessions, keyed by connection identity.
    pub registry: SessionRegistry,
}

/// Create the router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/execute", post(execute_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler.
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Body of a synchronous execution request.
#[derive(Debug, Deserialize)]
pub struct ExecuteBody {
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub stdin: Option<String>,
}

/// Body of a successful synchronous execution response.
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub output: String,
}

/// Run a program to completion and return its captured output.
///
/// A run counts as failed if it exited non-zero, wrote to standard error,
/// or was killed on deadline; the error payload carries the captured
/// stderr text where available.
async fn execute_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ExecuteBody>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let result = state
        .runner
        .execute(ExecuteRequest {
            code: &body.code,
            language: &body.language,
            stdin: body.stdin.as_deref().map(str::as_bytes),
        })
        .await?;

    if result.status == ExecutionStatus::TimedOut {
        return Err(ApiError::ExecutionFailed("execution timed out".to_string()));
    }

    if !result.is_success() || !result.stderr.is_empty() {
        let message = if result.stderr.is_empty() {
            format!(
                "process exited with code {}",
                result.exit_code.unwrap_or(-1)
            )
        } else {
            result.stderr_lossy()
        };
        return Err(ApiError::ExecutionFailed(message));
    }

    Ok(Json(ExecuteResponse {
        output: result.stdout_lossy(),
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

/// Handle one WebSocket connection.
///
/// Each connection owns at most one live session. A `start` while a run is
/// active kills the old process and releases its artifacts before the new
/// run is provisioned; dropping the connection does the same.
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let connection = Uuid::new_v4();
    debug!(%connection, "websocket connected");

    let (mut sender, mut receiver) = socket.split();

    // All server messages funnel through one channel so chunks from the
    // session task and protocol errors stay ordered per connection.
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(100);

    let forward_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(?e, "failed to serialize server message"),
            }
        }
    });

    while let Some(result) = receiver.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(%connection, ?e, "websocket receive error");
                break;
            }
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Start { code, language }) => {
                handle_start(&state, connection, &out_tx, &code, &language).await;
            }
            Ok(ClientMessage::Input { input }) => {
                handle_input(&state, connection, &out_tx, &input).await;
            }
            Err(e) => {
                let _ = out_tx
                    .send(ServerMessage::Error {
                        message: format!("invalid message: {e}"),
                    })
                    .await;
            }
        }
    }

    // Connection gone: no process outlives it.
    state.registry.remove(connection).await;
    forward_task.abort();
    debug!(%connection, "websocket closed");
}

async fn handle_start(
    state: &Arc<AppState>,
    connection: Uuid,
    out_tx: &mpsc::Sender<ServerMessage>,
    code: &str,
    language: &str,
) {
    // Kill-before-replace: the previous run is fully torn down before the
    // new one allocates anything.
    state.registry.remove(connection).await;

    match state.runner.start_session(code, language).await {
        Ok((mut events, handle)) => {
            state.registry.replace(connection, handle).await;

            let out_tx = out_tx.clone();
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    let msg = match event {
                        SessionEvent::Stdout(chunk) => ServerMessage::Output {
                            message: String::from_utf8_lossy(&chunk).into_owned(),
                        },
                        SessionEvent::Stderr(chunk) => ServerMessage::Error {
                            message: String::from_utf8_lossy(&chunk).into_owned(),
                        },
                        SessionEvent::Exited(result) => {
                            let _ = out_tx.send(ServerMessage::close_for(&result)).await;
                            break;
                        }
                    };
                    if out_tx.send(msg).await.is_err() {
                        break;
                    }
                }
            });
        }
        Err(e) => {
            // Provisioning failed: the session never ran, but the client
            // still gets a close so it can reset its UI.
            let _ = out_tx
                .send(ServerMessage::Error {
                    message: e.to_string(),
                })
                .await;
            let _ = out_tx
                .send(ServerMessage::Close {
                    message: "-1".to_string(),
                })
                .await;
        }
    }
}

async fn handle_input(
    state: &Arc<AppState>,
    connection: Uuid,
    out_tx: &mpsc::Sender<ServerMessage>,
    input: &str,
) {
    let Some(handle) = state.registry.get(connection).await else {
        let _ = out_tx
            .send(ServerMessage::Error {
                message: "no process is running".to_string(),
            })
            .await;
        return;
    };

    if handle.write_stdin(input.as_bytes()).await.is_err() {
        let _ = out_tx
            .send(ServerMessage::Error {
                message: "no process is running".to_string(),
            })
            .await;
    }
}
