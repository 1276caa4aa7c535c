//! Logging setup.
//!
//! Diagnostics go to stderr so stdout stays reserved for reports.
//! `RUST_LOG` takes precedence over the verbosity flags.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Default filter directive for a verbosity level.
#[must_use]
pub const fn level_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// `filter` overrides the verbosity-derived directive; `RUST_LOG` overrides
/// both. With `json` set, events are written as one JSON object per line.
///
/// # Errors
///
/// Returns an error if a directive is invalid or a subscriber is already set.
pub fn init_logging(
    verbose: u8,
    quiet: bool,
    filter: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let fallback = filter.unwrap_or_else(|| level_directive(verbose, quiet));
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(value) if !value.trim().is_empty() => EnvFilter::try_new(value)?,
        _ => EnvFilter::try_new(fallback)?,
    };

    let show_target = verbose >= 2;
    let (text_layer, json_layer) = if json {
        let layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(show_target);
        (None, Some(layer))
    } else {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(show_target)
            .without_time();
        (Some(layer), None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .try_init()?;
    Ok(())
}

/// Subscriber for tests; output is captured by the test harness.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
