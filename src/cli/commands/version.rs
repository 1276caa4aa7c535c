//! Version command implementation.

use crate::backend::BUILTIN_BACKENDS;
use crate::error::Result;
use crate::output::OutputContext;
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    backends: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    commit: Option<&'a str>,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(ctx: &OutputContext) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };
    let commit = option_env!("DH_GIT_SHA").filter(|s| !s.trim().is_empty());

    if ctx.is_json() {
        ctx.json(&VersionOutput {
            version,
            build,
            backends: BUILTIN_BACKENDS,
            commit,
        })?;
        return Ok(());
    }

    let mut line = format!("dh version {version} ({build})");
    if let Some(commit) = commit {
        let short = &commit[..commit.len().min(7)];
        let _ = write!(line, " ({short})");
    }
    if !ctx.is_quiet() {
        println!("{line}");
    }
    Ok(())
}
