//! The comparator: turns one fixture's execution results into a verdict.
//!
//! Every special case (nondeterministic fixtures, expected crashes,
//! timeouts) is decided here and nowhere else. Rows are evaluated in order
//! and the first match wins:
//!
//! 1. fixture flagged nondeterministic -> SKIPPED
//! 2. a configured config has no result -> ERROR
//! 3. any execution cancelled -> SKIPPED
//! 4. any execution timed out -> TIMEOUT
//! 5. any execution failed to launch -> ERROR
//! 6. any stdout exceeded the capture limit -> ERROR
//! 7. some execution crashed and not all crashed identically -> ERROR
//! 8. stdout and exit codes identical everywhere -> PASS
//! 9. otherwise -> MISMATCH with a diff against the first config

pub mod diff;

pub use diff::{Divergence, first_divergence, render_line_diff};

use crate::model::{ExecutionResult, FixtureDescriptor, Verdict, VerdictStatus};
use std::fmt::Write as _;

/// Compares results across a fixed, ordered set of execution configs.
#[derive(Debug, Clone)]
pub struct Comparator {
    configs: Vec<String>,
}

impl Comparator {
    /// `configs` are the run's config names; the first is the reference
    /// every other config is diffed against.
    #[must_use]
    pub fn new<I, S>(configs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            configs: configs.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn configs(&self) -> &[String] {
        &self.configs
    }

    /// Produce exactly one verdict for `fixture` from `results`.
    #[must_use]
    pub fn compare(&self, fixture: &FixtureDescriptor, results: &[ExecutionResult]) -> Verdict {
        let verdict = |status| Verdict::new(&fixture.id, status);

        if fixture.nondeterministic_expected {
            return verdict(VerdictStatus::Skipped).with_detail("output is expected to diverge");
        }

        let mut ordered = Vec::with_capacity(self.configs.len());
        for name in &self.configs {
            match results.iter().find(|r| &r.config_name == name) {
                Some(result) => ordered.push(result),
                None => {
                    return verdict(VerdictStatus::Error)
                        .with_detail(format!("no result for config '{name}'"));
                }
            }
        }

        if ordered.iter().any(|r| r.cancelled) {
            return verdict(VerdictStatus::Skipped).with_detail("run cancelled");
        }

        let timed_out: Vec<_> = ordered.iter().filter(|r| r.timed_out).collect();
        if !timed_out.is_empty() {
            let detail = timed_out
                .iter()
                .map(|r| format!("{} timed out after {}ms", r.config_name, r.duration_ms))
                .collect::<Vec<_>>()
                .join("; ");
            return verdict(VerdictStatus::Timeout).with_detail(detail);
        }

        if let Some(failed) = ordered.iter().find(|r| r.launch_error.is_some()) {
            return verdict(VerdictStatus::Error)
                .with_detail(format!("{}: {}", failed.config_name, failed.outcome()));
        }

        if let Some(truncated) = ordered.iter().find(|r| r.stdout_truncated) {
            return verdict(VerdictStatus::Error).with_detail(format!(
                "{}: stdout exceeded the capture limit ({} bytes kept)",
                truncated.config_name,
                truncated.stdout.len()
            ));
        }

        if ordered.iter().any(|r| r.crashed) && !crashed_identically(&ordered) {
            let detail = ordered
                .iter()
                .map(|r| format!("{}: {}", r.config_name, r.outcome()))
                .collect::<Vec<_>>()
                .join("; ");
            return verdict(VerdictStatus::Error).with_detail(format!("crash mismatch: {detail}"));
        }

        let Some((reference, rest)) = ordered.split_first() else {
            return verdict(VerdictStatus::Error).with_detail("no execution configs");
        };
        let divergent: Vec<_> = rest
            .iter()
            .filter(|r| r.stdout != reference.stdout || r.exit_code != reference.exit_code)
            .collect();

        if divergent.is_empty() {
            return verdict(VerdictStatus::Pass);
        }

        let detail = divergent
            .iter()
            .map(|other| describe_mismatch(reference, other))
            .collect::<Vec<_>>()
            .join("\n");
        verdict(VerdictStatus::Mismatch).with_detail(detail.trim_end().to_string())
    }
}

/// Every result crashed with the same signature and exit code.
fn crashed_identically(results: &[&ExecutionResult]) -> bool {
    let Some((first, rest)) = results.split_first() else {
        return true;
    };
    first.crashed
        && rest.iter().all(|r| {
            r.crashed && r.exit_code == first.exit_code && r.crash_signature == first.crash_signature
        })
}

fn describe_mismatch(reference: &ExecutionResult, other: &ExecutionResult) -> String {
    let mut out = format!("{} differs from {}", other.config_name, reference.config_name);
    match first_divergence(&reference.stdout, &other.stdout) {
        Some(d) => {
            let _ = writeln!(
                out,
                ": first divergent byte at offset {} (line {}, column {})",
                d.offset, d.line, d.column
            );
        }
        None => out.push_str(": stdout identical\n"),
    }
    if reference.exit_code != other.exit_code {
        let _ = writeln!(
            out,
            "exit code: {}={} {}={}",
            reference.config_name, reference.exit_code, other.config_name, other.exit_code
        );
    }
    if reference.stdout != other.stdout {
        out.push_str(&render_line_diff(
            &reference.config_name,
            &reference.stdout,
            &other.config_name,
            &other.stdout,
        ));
    }
    out
}
