//! Command implementations.

pub mod completions;
pub mod configs;
pub mod list;
pub mod run;
pub mod version;

use crate::cli::SourceArgs;
use crate::config::{self, CliOverrides, ConfigLayer};
use crate::error::{HarnessError, Result};
use regex::Regex;

/// Compile an optional `--filter` pattern.
///
/// # Errors
///
/// Returns `InvalidFilter` when the pattern is not a valid regex.
pub fn compile_filter(pattern: Option<&str>) -> Result<Option<Regex>> {
    pattern
        .map(|raw| {
            Regex::new(raw).map_err(|err| HarnessError::InvalidFilter {
                pattern: raw.to_string(),
                reason: err.to_string(),
            })
        })
        .transpose()
}

/// Load the merged config layer for `source`.
///
/// # Errors
///
/// Returns `RootNotFound` for a missing fixture root, or an error if a
/// config file cannot be read or parsed.
pub fn load_layer(source: &SourceArgs, overrides: &CliOverrides) -> Result<ConfigLayer> {
    if !source.root.is_dir() {
        return Err(HarnessError::RootNotFound {
            path: source.root.clone(),
        });
    }
    config::load_config(&source.root, source.config_file.as_deref(), overrides)
}
