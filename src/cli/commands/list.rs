//! `dh list`: show discovered fixtures without running them.
//!
//! Does not require any execution config to be defined.

use super::{compile_filter, load_layer};
use crate::cli::ListArgs;
use crate::config::{CliOverrides, DEFAULT_TIMEOUT_MS};
use crate::error::{HarnessError, Result};
use crate::fixture::{Discovery, FixtureLoader};
use crate::model::FixtureDescriptor;
use crate::output::OutputContext;
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Serialize)]
struct BrokenFixture {
    id: String,
    path: String,
    error: String,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    fixtures: &'a [FixtureDescriptor],
    broken: Vec<BrokenFixture>,
}

/// Execute the list command.
///
/// # Errors
///
/// Returns an error for a missing root, an invalid filter, a malformed
/// `timeout-ms` setting, or duplicate fixture ids.
pub fn execute(args: &ListArgs, ctx: &OutputContext) -> Result<()> {
    let filter = compile_filter(args.filter.as_deref())?;
    let layer = load_layer(&args.source, &CliOverrides::default())?;
    let timeout_ms = match layer.get("timeout-ms") {
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            HarnessError::config(format!("timeout-ms: expected a number, got '{raw}'"))
        })?,
        None => DEFAULT_TIMEOUT_MS,
    };

    let loader = FixtureLoader::new(&args.source.root, timeout_ms)?;
    let discovery = loader.load_all(filter.as_ref())?;

    if ctx.is_json() {
        let output = ListOutput {
            fixtures: &discovery.fixtures,
            broken: discovery
                .broken
                .iter()
                .map(|err| BrokenFixture {
                    id: err.fixture_id().to_string(),
                    path: err.path().display().to_string(),
                    error: err.to_string(),
                })
                .collect(),
        };
        ctx.json_pretty(&output)?;
        return Ok(());
    }

    ctx.print_plain(&render_listing(&discovery));
    Ok(())
}

fn render_listing(discovery: &Discovery) -> String {
    let width = discovery
        .fixtures
        .iter()
        .map(|f| f.qualified_name().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for fixture in &discovery.fixtures {
        let _ = write!(
            out,
            "{:<width$}  {}  {}ms",
            fixture.qualified_name(),
            fixture.entry_point,
            fixture.timeout_ms
        );
        if !fixture.args.is_empty() {
            let _ = write!(out, "  args: {}", fixture.args.join(" "));
        }
        if fixture.nondeterministic_expected {
            out.push_str("  [nondeterministic]");
        }
        out.push('\n');
    }
    for err in &discovery.broken {
        let _ = writeln!(out, "{}  ERROR: {err}", err.fixture_id());
    }
    let _ = writeln!(
        out,
        "{} fixture(s), {} broken",
        discovery.fixtures.len(),
        discovery.broken.len()
    );
    out
}
