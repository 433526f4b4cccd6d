//! Active session registry
//!
//! Tracks at most one live session per connection. Starting a new run on a
//! connection that already has one kills the old session and waits for its
//! teardown before the caller proceeds, so two runs from the same
//! connection never overlap.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::runner::SessionHandle;

/// Registry of live sessions keyed by connection id
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for a connection, replacing any existing one.
    ///
    /// If the connection already has a live session it is killed first and
    /// this call does not return until its teardown (process reaped,
    /// artifacts released) has completed.
    pub async fn replace(&self, connection: Uuid, handle: SessionHandle) {
        let previous = {
            let mut sessions = self.sessions.lock().await;
            sessions.insert(connection, handle)
        };

        if let Some(mut previous) = previous {
            debug!(%connection, "killing previous session before replacement");
            previous.kill_and_wait().await;
        }
    }

    /// Remove a connection's session without killing it
    pub async fn take(&self, connection: Uuid) -> Option<SessionHandle> {
        self.sessions.lock().await.remove(&connection)
    }

    /// Remove a connection's session and kill it if still running.
    ///
    /// Called when a connection goes away; waits for teardown so the
    /// session's artifacts are gone when this returns.
    pub async fn remove(&self, connection: Uuid) {
        if let Some(mut handle) = self.take(connection).await {
            debug!(%connection, "removing session for closed connection");
            handle.kill_and_wait().await;
        }
    }

    /// Look up the live session for a connection
    pub async fn get(&self, connection: Uuid) -> Option<SessionHandle> {
        self.sessions.lock().await.get(&connection).cloned()
    }

    /// Number of registered sessions
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
