//! Progress indicator for a harness run.
//!
//! The bar is drawn on stderr only when stderr is an interactive terminal,
//! so piped or scripted runs stay clean.

use crate::model::Verdict;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{IsTerminal, stderr};

/// Check if we should show progress indicators.
#[must_use]
pub fn should_show_progress() -> bool {
    stderr().is_terminal()
}

/// Create a determinate progress bar, hidden unless `show` is set.
#[must_use]
pub fn create_progress_bar(total: u64, message: &str, show: bool) -> ProgressBar {
    let pb = ProgressBar::new(total);

    if show {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map_or_else(|_| ProgressStyle::default_bar(), |style| style.progress_chars("=>-"));
        pb.set_style(style);
        pb.set_message(message.to_string());
    } else {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    pb
}

/// Tracks fixtures as their verdicts arrive.
pub struct RunProgress {
    bar: ProgressBar,
    failures: u64,
}

impl RunProgress {
    #[must_use]
    pub fn new(total: usize, show: bool) -> Self {
        Self {
            bar: create_progress_bar(u64::try_from(total).unwrap_or(u64::MAX), "running fixtures", show),
            failures: 0,
        }
    }

    /// Record one final verdict.
    pub fn record(&mut self, verdict: &Verdict) {
        if verdict.status.is_failure() {
            self.failures += 1;
            self.bar
                .println(format!("{} {}", verdict.status, verdict.fixture_id));
            self.bar.set_message(format!("{} failing", self.failures));
        }
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.failures
    }
}
