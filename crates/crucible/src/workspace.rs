//! Session workspace management
//!
//! Allocates the per-session scratch directory that holds a run's source
//! file and, for compiled languages, its binary, and guarantees removal of
//! everything in it when the session ends.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::Language;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write source file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid file name: {0}")]
    InvalidPath(String),
}

/// Root directory under which session workspaces are allocated
#[derive(Debug, Clone)]
pub struct WorkspaceRoot {
    root: PathBuf,
}

impl WorkspaceRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Allocate a workspace for one session and write its source file.
    ///
    /// The directory name embeds a fresh UUID, so concurrent sessions never
    /// share a path. If the source cannot be written the directory is
    /// removed again and no process is started.
    #[instrument(skip(self, code), fields(language = %language.name))]
    pub async fn allocate(
        &self,
        language: &Language,
        code: &[u8],
    ) -> Result<Workspace, WorkspaceError> {
        let id = Uuid::new_v4();
        let dir = self.root.join(id.to_string());

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: dir.clone(),
                source,
            })?;

        let source_name = language.source_name();
        let source_path = dir.join(&source_name);

        if let Err(source) = tokio::fs::write(&source_path, code).await {
            // Roll back the directory; the session never existed.
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                warn!(dir = %dir.display(), error = %e, "failed to remove workspace after write failure");
            }
            return Err(WorkspaceError::Write {
                path: source_path,
                source,
            });
        }

        debug!(dir = %dir.display(), source_name, len = code.len(), "allocated workspace");

        Ok(Workspace {
            id,
            dir,
            source_name,
            released: false,
        })
    }
}

/// One session's scratch directory
///
/// # Cleanup
///
/// Call [`release()`](Self::release) on every exit path. Release never
/// fails the session: deletion errors are logged and swallowed. The `Drop`
/// implementation performs best-effort removal with a warning, but explicit
/// release is the contract.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,

    /// Session directory holding source and any build output
    dir: PathBuf,

    /// Source file name inside the directory
    source_name: String,

    released: bool,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn source_path(&self) -> PathBuf {
        self.dir.join(&self.source_name)
    }

    /// Get the path to a file inside the workspace
    ///
    /// Returns an error if the name contains path traversal attempts.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, WorkspaceError> {
        if name.contains("..") || name.starts_with('/') {
            return Err(WorkspaceError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        Ok(self.dir.join(name))
    }

    /// Remove the session directory and everything in it.
    ///
    /// Idempotent. Deletion errors are logged and swallowed so cleanup
    /// never turns a finished session into a failure.
    #[instrument(skip(self), fields(id = %self.id))]
    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => debug!(dir = %self.dir.display(), "released workspace"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to release workspace");
            }
        }
    }

    /// Check if the workspace has already been released
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                id = %self.id,
                dir = %self.dir.display(),
                "Workspace dropped without explicit release! \
                 Call release() on every exit path. \
                 Attempting best-effort removal."
            );
            if let Err(e) = std::fs::remove_dir_all(&self.dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(dir = %self.dir.display(), error = %e, "best-effort removal failed");
                }
            }
        }
    }
}
