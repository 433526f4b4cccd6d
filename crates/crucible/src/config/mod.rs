use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::{CompileConfig, FileExtension, Language, RunConfig};

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file. It is
/// also the default language profile set.
pub const EXAMPLE_CONFIG: &str = include_str!("../../crucible.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("unsupported language '{0}'")]
    LanguageNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for Crucible
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root directory for per-session workspaces.
    ///
    /// Defaults to `crucible` under the system temp directory.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Default wall-clock deadline for the run step, in seconds.
    /// A language's `run.timeout_secs` overrides this.
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: f64,

    /// Default wall-clock deadline for the build step, in seconds.
    /// A language's `compile.timeout_secs` overrides this.
    #[serde(default = "default_compile_timeout")]
    pub compile_timeout_secs: f64,

    /// Language configurations keyed by lowercase language ID
    #[serde(default)]
    pub languages: HashMap<String, Language>,
}

impl Config {
    /// Create a new config with the embedded default languages
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            run_timeout_secs: default_run_timeout(),
            compile_timeout_secs: default_compile_timeout(),
            languages: HashMap::new(),
        }
    }

    /// Get a language by ID. Lookup is case-insensitive.
    pub fn get_language(&self, id: &str) -> Result<&Language, ConfigError> {
        self.languages
            .get(&id.to_ascii_lowercase())
            .ok_or_else(|| ConfigError::LanguageNotFound(id.to_string()))
    }

    /// Effective run deadline for a language
    pub fn run_timeout(&self, language: &Language) -> Duration {
        Duration::from_secs_f64(
            language
                .run
                .timeout_secs
                .unwrap_or(self.run_timeout_secs),
        )
    }

    /// Effective build deadline for a language
    pub fn compile_timeout(&self, language: &Language) -> Duration {
        let secs = language
            .compile
            .as_ref()
            .and_then(|c| c.timeout_secs)
            .unwrap_or(self.compile_timeout_secs);
        Duration::from_secs_f64(secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("crucible")
}

fn default_run_timeout() -> f64 {
    30.0
}

fn default_compile_timeout() -> f64 {
    30.0
}
