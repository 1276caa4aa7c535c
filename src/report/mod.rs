//! Report aggregation and rendering.
//!
//! [`Report::from_verdicts`] is a pure function: building it twice from the
//! same verdicts gives equal reports regardless of input order. Timestamps
//! live in [`RunInfo`], outside the report, so they never break that.
//!
//! Renderers:
//! - [`text`] - grouped plain-text summary
//! - [`csv`] - one row per (fixture, config) run
//! - JSON via [`ReportDocument`]

pub mod csv;
pub mod text;

pub use text::render_text;

use crate::model::{Verdict, VerdictStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Run-level counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    /// Fixtures whose outputs diverged (MISMATCH).
    pub failed: usize,
    pub errored: usize,
    pub timed_out: usize,
    pub skipped: usize,
}

impl Summary {
    fn record(&mut self, status: VerdictStatus) {
        self.total += 1;
        match status {
            VerdictStatus::Pass => self.passed += 1,
            VerdictStatus::Mismatch => self.failed += 1,
            VerdictStatus::Error => self.errored += 1,
            VerdictStatus::Timeout => self.timed_out += 1,
            VerdictStatus::Skipped => self.skipped += 1,
        }
    }

    #[must_use]
    pub const fn count(&self, status: VerdictStatus) -> usize {
        match status {
            VerdictStatus::Pass => self.passed,
            VerdictStatus::Mismatch => self.failed,
            VerdictStatus::Error => self.errored,
            VerdictStatus::Timeout => self.timed_out,
            VerdictStatus::Skipped => self.skipped,
        }
    }
}

/// Aggregate execution timing for one config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTiming {
    pub config: String,
    pub runs: usize,
    pub total_ms: u64,
    pub max_ms: u64,
}

/// Final result of a harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub summary: Summary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timings: Vec<ConfigTiming>,
    pub verdicts: Vec<Verdict>,
}

impl Report {
    /// Aggregate `verdicts` into a report sorted by fixture id.
    #[must_use]
    pub fn from_verdicts(verdicts: impl IntoIterator<Item = Verdict>) -> Self {
        let mut verdicts: Vec<Verdict> = verdicts.into_iter().collect();
        verdicts.sort_by(|a, b| a.fixture_id.cmp(&b.fixture_id));

        let mut summary = Summary::default();
        let mut timings: Vec<ConfigTiming> = Vec::new();
        for verdict in &verdicts {
            summary.record(verdict.status);
            for run in &verdict.runs {
                let timing = match timings.iter().position(|t| t.config == run.config) {
                    Some(idx) => &mut timings[idx],
                    None => {
                        timings.push(ConfigTiming {
                            config: run.config.clone(),
                            runs: 0,
                            total_ms: 0,
                            max_ms: 0,
                        });
                        let last = timings.len() - 1;
                        &mut timings[last]
                    }
                };
                timing.runs += 1;
                timing.total_ms = timing.total_ms.saturating_add(run.duration_ms);
                timing.max_ms = timing.max_ms.max(run.duration_ms);
            }
        }

        Self {
            summary,
            timings,
            verdicts,
        }
    }

    /// No MISMATCH, ERROR or TIMEOUT verdicts.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.verdicts.iter().any(|v| v.status.is_failure())
    }

    /// Process exit code: 0 on success, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }

    pub fn with_status(&self, status: VerdictStatus) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(move |v| v.status == status)
    }

    /// One-line count summary, e.g. `4 fixtures: 3 passed, 1 failed, ...`.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let s = &self.summary;
        format!(
            "{} fixture{}: {} passed, {} failed, {} errored, {} timed out, {} skipped",
            s.total,
            if s.total == 1 { "" } else { "s" },
            s.passed,
            s.failed,
            s.errored,
            s.timed_out,
            s.skipped
        )
    }
}

/// Context of a run that produced a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub root: String,
    pub configs: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// JSON document written for `--format json` and `--report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub run: RunInfo,
    pub report: Report,
}

impl ReportDocument {
    /// Write the document as pretty JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json + "\n")?;
        Ok(())
    }
}
