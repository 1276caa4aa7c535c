//! Error types and handling for `diffharness`.
//!
//! Only harness-level failures live here: anything that stops a run before a
//! single fixture executes (bad configuration, duplicate fixture ids, an
//! unreadable root). Per-fixture failures never surface as a `HarnessError`;
//! they become verdicts.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for wrapped errors
//! - Provides recovery hints for user-facing errors
//! - Provides structured JSON output for scripted callers

mod structured;

pub use structured::{ErrorCode, StructuredError, find_similar_names};

use crate::fixture::DiscoveryError;
use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `diffharness` operations.
#[derive(Error, Debug)]
pub enum HarnessError {
    // === Configuration Errors ===
    /// Configuration value is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A selected execution config has no definition.
    #[error("Execution config '{name}' is not defined")]
    UnknownConfig { name: String, known: Vec<String> },

    /// The same execution config was selected twice.
    #[error("Execution config '{name}' selected more than once")]
    DuplicateConfig { name: String },

    /// No execution configs were selected.
    #[error("No execution configs selected")]
    NoConfigs,

    /// An execution config names a backend that does not exist.
    #[error("Execution config '{config}' uses unknown backend '{backend}'")]
    UnknownBackend { config: String, backend: String },

    /// Filter pattern does not compile.
    #[error("Invalid filter '{pattern}': {reason}")]
    InvalidFilter { pattern: String, reason: String },

    // === Discovery Errors ===
    /// Fixture root does not exist or is not a directory.
    #[error("Fixture root not found: '{path}'")]
    RootNotFound { path: PathBuf },

    /// Two fixture directories resolved to the same id.
    #[error("Duplicate fixture id '{id}': '{first}' and '{second}'")]
    DuplicateFixture {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Discovery failed in a way that cannot be contained to one fixture.
    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Error with additional context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HarnessError {
    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnknownConfig { .. }
                | Self::DuplicateConfig { .. }
                | Self::NoConfigs
                | Self::UnknownBackend { .. }
                | Self::InvalidFilter { .. }
                | Self::RootNotFound { .. }
                | Self::DuplicateFixture { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NoConfigs => Some("Pass --configs a,b or set `select:` in harness.yaml"),
            Self::DuplicateConfig { .. } => Some("List each execution config once"),
            Self::UnknownBackend { .. } => Some("The only built-in backend is 'process'"),
            Self::InvalidFilter { .. } => Some("Filters are regular expressions matched against fixture ids"),
            Self::RootNotFound { .. } => Some("Check the --root path"),
            Self::DuplicateFixture { .. } => {
                Some("Give one of the fixtures an explicit `id:` in its fixture.yaml")
            }
            _ => None,
        }
    }

    /// Exit code for harness-level failures.
    ///
    /// Every harness-level failure aborts the run before any fixture executes,
    /// so they all share the configuration/discovery exit code.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        2
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type using `HarnessError`.
pub type Result<T> = std::result::Result<T, HarnessError>;
