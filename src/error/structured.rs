//! Structured error output for scripted callers.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Context for debugging
//!
//! Unknown execution config names get "did you mean" suggestions computed
//! with Levenshtein distance against the configs that are defined.

#![allow(clippy::option_if_let_else)]

use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Config Errors ===
    /// Configuration error
    ConfigError,
    /// Selected execution config is not defined
    UnknownConfig,
    /// Execution config selected twice
    DuplicateConfig,
    /// No execution configs selected
    NoConfigs,
    /// Unknown backend kind
    UnknownBackend,
    /// Filter pattern invalid
    InvalidFilter,

    // === Discovery Errors ===
    /// Fixture root missing
    RootNotFound,
    /// Duplicate fixture id
    DuplicateFixture,
    /// Fixture metadata malformed
    DiscoveryError,

    // === I/O Errors ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,

    // === Internal Errors ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigError => "CONFIG_ERROR",
            Self::UnknownConfig => "UNKNOWN_CONFIG",
            Self::DuplicateConfig => "DUPLICATE_CONFIG",
            Self::NoConfigs => "NO_CONFIGS",
            Self::UnknownBackend => "UNKNOWN_BACKEND",
            Self::InvalidFilter => "INVALID_FILTER",
            Self::RootNotFound => "ROOT_NOT_FOUND",
            Self::DuplicateFixture => "DUPLICATE_FIXTURE",
            Self::DiscoveryError => "DISCOVERY_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether fixing the input and re-running could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UnknownConfig
                | Self::DuplicateConfig
                | Self::NoConfigs
                | Self::InvalidFilter
                | Self::RootNotFound
        )
    }

    /// Process exit code for this error.
    ///
    /// Configuration and discovery failures abort the run with 2; anything
    /// else that escapes to the top level is also reported as 2 because no
    /// verdict could be produced.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        2
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the run can be retried after fixing input
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `HarnessError`.
    #[must_use]
    pub fn from_error(err: &HarnessError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = Self::generate_hint(err);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &HarnessError) -> (ErrorCode, Option<Value>) {
        match err {
            HarnessError::Config(_) => (ErrorCode::ConfigError, None),
            HarnessError::UnknownConfig { name, known } => (
                ErrorCode::UnknownConfig,
                Some(json!({"name": name, "known": known})),
            ),
            HarnessError::DuplicateConfig { name } => {
                (ErrorCode::DuplicateConfig, Some(json!({"name": name})))
            }
            HarnessError::NoConfigs => (ErrorCode::NoConfigs, None),
            HarnessError::UnknownBackend { config, backend } => (
                ErrorCode::UnknownBackend,
                Some(json!({"config": config, "backend": backend})),
            ),
            HarnessError::InvalidFilter { pattern, .. } => {
                (ErrorCode::InvalidFilter, Some(json!({"pattern": pattern})))
            }
            HarnessError::RootNotFound { path } => (
                ErrorCode::RootNotFound,
                Some(json!({"path": path.display().to_string()})),
            ),
            HarnessError::DuplicateFixture { id, first, second } => (
                ErrorCode::DuplicateFixture,
                Some(json!({
                    "id": id,
                    "paths": [first.display().to_string(), second.display().to_string()],
                })),
            ),
            HarnessError::Discovery(inner) => (
                ErrorCode::DiscoveryError,
                Some(json!({"fixture_id": inner.fixture_id()})),
            ),
            HarnessError::Io(_) => (ErrorCode::IoError, None),
            HarnessError::Json(_) => (ErrorCode::JsonError, None),
            HarnessError::Yaml(_) => (ErrorCode::YamlError, None),
            HarnessError::WithContext { context, .. } => {
                (ErrorCode::InternalError, Some(json!({"context": context})))
            }
            HarnessError::Other(_) => (ErrorCode::InternalError, None),
        }
    }

    fn generate_hint(err: &HarnessError) -> Option<String> {
        if let HarnessError::UnknownConfig { name, known } = err {
            let similar = find_similar_names(name, known, 3);
            return if similar.is_empty() {
                if known.is_empty() {
                    Some("No execution configs are defined; add a `configs:` section to harness.yaml".to_string())
                } else {
                    Some(format!("Defined configs: {}", known.join(", ")))
                }
            } else if similar.len() == 1 {
                Some(format!("Did you mean '{}'?", similar[0]))
            } else {
                Some(format!("Did you mean one of: {}?", similar.join(", ")))
            };
        }

        err.suggestion().map(ToString::to_string)
    }
}

// === Levenshtein Distance ===

/// Calculate the Levenshtein distance between two strings.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0; b_len + 1]; a_len + 1];

    for (i, row) in matrix.iter_mut().enumerate().take(a_len + 1) {
        row[0] = i;
    }
    for (j, item) in matrix[0].iter_mut().enumerate().take(b_len + 1) {
        *item = j;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    for (i, a_char) in a_chars.iter().enumerate() {
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            matrix[i + 1][j + 1] = std::cmp::min(
                std::cmp::min(matrix[i][j + 1] + 1, matrix[i + 1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }

    matrix[a_len][b_len]
}

/// Find names similar to `searched` using Levenshtein distance.
///
/// Returns up to `max_suggestions` names with distance <= 3.
#[must_use]
pub fn find_similar_names(searched: &str, existing: &[String], max_suggestions: usize) -> Vec<String> {
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|name| (levenshtein_distance(searched, name), name.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max_suggestions)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::UnknownConfig.as_str(), "UNKNOWN_CONFIG");
        assert_eq!(ErrorCode::DuplicateFixture.as_str(), "DUPLICATE_FIXTURE");
        assert_eq!(ErrorCode::InternalError.as_str(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_error_code_is_retryable() {
        assert!(ErrorCode::UnknownConfig.is_retryable());
        assert!(!ErrorCode::IoError.is_retryable());
    }

    #[test]
    fn test_structured_error_to_json() {
        let err = StructuredError::from_error(&HarnessError::RootNotFound {
            path: PathBuf::from("/nope"),
        });
        let json = err.to_json();
        assert_eq!(json["error"]["code"], "ROOT_NOT_FOUND");
        assert_eq!(json["error"]["context"]["path"], "/nope");
        assert_eq!(json["error"]["hint"], "Check the --root path");
    }

    #[test]
    fn test_unknown_config_suggests_close_name() {
        let err = HarnessError::UnknownConfig {
            name: "optimised".to_string(),
            known: vec!["baseline".to_string(), "optimized".to_string()],
        };
        let structured = StructuredError::from_error(&err);
        assert_eq!(structured.code, ErrorCode::UnknownConfig);
        assert_eq!(structured.hint.as_deref(), Some("Did you mean 'optimized'?"));
    }

    #[test]
    fn test_to_human_plain() {
        let structured = StructuredError::from_error(&HarnessError::NoConfigs);
        let human = structured.to_human(false);
        assert!(human.starts_with("Error: No execution configs selected"));
        assert!(human.contains("Hint: "));
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_find_similar_names() {
        let existing = vec![
            "baseline".to_string(),
            "optimized".to_string(),
            "interpreted".to_string(),
        ];
        let suggestions = find_similar_names("baselin", &existing, 3);
        assert_eq!(suggestions, vec!["baseline".to_string()]);
        assert!(find_similar_names("zzz", &existing, 3).is_empty());
    }
}
