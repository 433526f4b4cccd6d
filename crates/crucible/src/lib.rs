//! A library for remote code execution.
//!
//! Crucible provides an async Rust API for compiling and running short
//! programs in per-session scratch workspaces. It supports flexible
//! language configuration, batch and interactive streaming execution, and
//! wall-clock deadlines with forced kill.
//!
//! # Features
//!
//! - **Multi-language** — Supports both compiled and interpreted languages.
//! - **TOML configuration** — Flexible per-language compiler/runtime settings.
//! - **Batch execution** — Run a program to completion and collect its output.
//! - **Interactive execution** — Channel-based sessions with live stdin/stdout/stderr.
//! - **Session isolation** — Each run gets a fresh workspace directory, removed on exit.
//! - **Deadlines** — Wall-clock timeouts that kill runaway programs.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Language};
pub use registry::SessionRegistry;
pub use runner::{
    ExecuteError, ExecuteRequest, Runner, SessionError, SessionEvent, SessionEventStream,
    SessionHandle,
};
pub use types::{ExecutionResult, ExecutionStatus};
pub use workspace::{Workspace, WorkspaceError, WorkspaceRoot};

pub mod config;
pub mod process;
pub mod registry;
pub mod runner;
pub mod types;
pub mod workspace;
