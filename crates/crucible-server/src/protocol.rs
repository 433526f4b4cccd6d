//! WebSocket protocol messages for the crucible server.
//!
//! Defines the message types exchanged between client and server.

use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Begin a run. Replaces any run already active on this connection.
    Start {
        /// Source code to execute.
        code: String,
        /// Language identifier (case-insensitive).
        language: String,
    },

    /// Forward text to the running process's standard input.
    Input {
        /// Data to write, relayed in send order.
        input: String,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A chunk of the process's standard output.
    Output {
        /// Output text, forwarded in arrival order.
        message: String,
    },

    /// A chunk of the process's standard error, or a session-level error.
    Error {
        /// Error text.
        message: String,
    },

    /// The run ended. Sent exactly once per run.
    Close {
        /// The process exit code, encoded as text. `-1` when the process
        /// was killed before exiting normally.
        message: String,
    },
}

impl ServerMessage {
    /// Build the close message for an execution result.
    pub fn close_for(result: &crucible::ExecutionResult) -> Self {
        Self::Close {
            message: result.exit_code.unwrap_or(-1).to_string(),
        }
    }
}
