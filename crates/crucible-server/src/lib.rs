//! Crucible code execution server.
//!
//! Exposes the crucible runner over two protocols: a synchronous HTTP
//! endpoint that runs a program to completion and returns its output, and a
//! WebSocket channel for interactive runs with live stdin/stdout/stderr.
//!
//! # Architecture
//!
//! The server consists of:
//! - **Protocol**: Defines client/server WebSocket message types
//! - **Routes**: HTTP and WebSocket handlers
//! - **Error**: Maps runner errors onto HTTP responses
//!
//! Sessions are keyed by connection: starting a new run on a connection
//! kills and cleans up the previous one, and closing the connection kills
//! whatever it was running.

pub mod error;
pub mod protocol;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use crucible::{Config, Runner, SessionRegistry};
use tracing::info;

pub use error::ApiError;
pub use protocol::{ClientMessage, ServerMessage};
pub use routes::{AppState, create_router};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Start the server with the given runner configuration.
pub async fn serve(config: Config, server: ServerConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        runner: Runner::new(config),
        registry: SessionRegistry::new(),
    });

    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .context("invalid listen address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "listening");

    axum::serve(listener, router)
        .await
        .context("server error")?;

    Ok(())
}
