//! CSV rendering: one row per (fixture, config) run.
//!
//! Fixtures that never executed (discovery errors, cancelled before start)
//! get a single row with the run columns left empty.

use super::Report;
use crate::model::{RunSummary, Verdict};
use std::fmt::Write as _;
use std::io::{self, Write};

/// Column order of the CSV output.
pub const FIELDS: &[&str] = &[
    "fixture_id",
    "status",
    "config",
    "exit_code",
    "duration_ms",
    "timed_out",
    "crashed",
    "cancelled",
    "attempts",
    "stdout_bytes",
    "stdout_sha256",
    "crash_signature",
];

/// Escape a CSV field value.
///
/// Wraps in double quotes if the value contains commas, quotes, or newlines.
/// Doubles any existing quotes within the value.
#[must_use]
pub fn escape_field(value: &str) -> String {
    let needs_quoting = value.contains(',')
        || value.contains('"')
        || value.contains('\n')
        || value.contains('\r');

    if needs_quoting {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

fn run_values(verdict: &Verdict, run: Option<&RunSummary>) -> Vec<String> {
    let mut values = vec![
        verdict.fixture_id.clone(),
        verdict.status.as_str().to_string(),
    ];
    match run {
        Some(run) => values.extend([
            run.config.clone(),
            run.exit_code.to_string(),
            run.duration_ms.to_string(),
            run.timed_out.to_string(),
            run.crashed.to_string(),
            run.cancelled.to_string(),
            run.attempts.to_string(),
            run.stdout_bytes.to_string(),
            run.stdout_sha256.clone(),
            run.crash_signature.clone().unwrap_or_default(),
        ]),
        None => values.extend(std::iter::repeat_n(String::new(), FIELDS.len() - 2)),
    }
    values
}

fn format_row(values: &[String]) -> String {
    values
        .iter()
        .map(|value| escape_field(value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render the whole report as CSV text, header included.
#[must_use]
pub fn render_csv(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", FIELDS.join(","));
    for verdict in &report.verdicts {
        if verdict.runs.is_empty() {
            let _ = writeln!(out, "{}", format_row(&run_values(verdict, None)));
        }
        for run in &verdict.runs {
            let _ = writeln!(out, "{}", format_row(&run_values(verdict, Some(run))));
        }
    }
    out
}

/// Write the report as CSV to `writer`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_csv<W: Write>(writer: &mut W, report: &Report) -> io::Result<()> {
    writer.write_all(render_csv(report).as_bytes())
}
