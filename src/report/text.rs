//! Plain-text report rendering (no ANSI escapes).

use super::Report;
use crate::model::VerdictStatus;
use std::fmt::Write as _;

/// Order in which status groups are printed.
pub const GROUP_ORDER: [VerdictStatus; 5] = [
    VerdictStatus::Mismatch,
    VerdictStatus::Error,
    VerdictStatus::Timeout,
    VerdictStatus::Skipped,
    VerdictStatus::Pass,
];

/// Render `report` grouped by status, then the per-config timing table and
/// the summary line.
#[must_use]
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();

    for status in GROUP_ORDER {
        let count = report.summary.count(status);
        if count == 0 {
            continue;
        }
        let _ = writeln!(out, "{status} ({count})");
        for verdict in report.with_status(status) {
            let _ = writeln!(out, "  {}", verdict.fixture_id);
            if let Some(detail) = &verdict.detail {
                for line in detail.lines() {
                    let _ = writeln!(out, "      {line}");
                }
            }
        }
        out.push('\n');
    }

    if !report.timings.is_empty() {
        let width = report
            .timings
            .iter()
            .map(|t| t.config.len())
            .max()
            .unwrap_or(0);
        out.push_str("Timing:\n");
        for timing in &report.timings {
            let _ = writeln!(
                out,
                "  {:<width$}  runs={} total={}ms max={}ms",
                timing.config, timing.runs, timing.total_ms, timing.max_ms
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{}", report.summary_line());
    out
}
