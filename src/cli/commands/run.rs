//! `dh run`: execute fixtures under every selected config and report.

use super::{compile_filter, load_layer};
use crate::backend::Deadline;
use crate::cli::{ReportFormat, RunArgs};
use crate::config::{CliOverrides, HarnessSettings};
use crate::error::Result;
use crate::fixture::FixtureLoader;
use crate::model::VerdictStatus;
use crate::orchestrator::Orchestrator;
use crate::output::{OutputContext, SummaryPanel, TimingTable, VerdictTable};
use crate::report::csv::render_csv;
use crate::report::text::render_text;
use crate::report::{Report, ReportDocument, RunInfo};
use crate::util::progress::{RunProgress, should_show_progress};
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info};

/// Above this many fixtures the rich table only lists non-passing ones.
const FULL_TABLE_LIMIT: usize = 50;

impl RunArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            concurrency: self.concurrency,
            timeout_ms: self.timeout_ms,
            retries: self.retries,
            select: self.configs.clone(),
            max_output_bytes: self.max_output_bytes,
            deadline_ms: self.deadline_ms,
            sequential_configs: self.sequential_configs,
        }
    }
}

/// Execute the run command and return the process exit code.
///
/// Configuration and discovery problems are returned as errors before any
/// fixture executes; verdict failures are reported through the exit code.
///
/// # Errors
///
/// Returns an error for invalid configuration, an invalid filter, a missing
/// root, duplicate fixture ids, or a failure to write the report file.
pub fn execute(args: &RunArgs, ctx: &OutputContext) -> Result<i32> {
    let filter = compile_filter(args.filter.as_deref())?;
    let layer = load_layer(&args.source, &args.overrides())?;
    let settings = HarnessSettings::from_layer(&layer)?;
    let configs = settings.selected_names();
    info!(configs = ?configs, concurrency = settings.concurrency, "Resolved run settings");

    let orchestrator = Orchestrator::new(
        settings.selected.clone(),
        settings.run_options(),
        settings.max_output_bytes,
    )?;
    let loader = FixtureLoader::new(&args.source.root, settings.timeout_ms)?;
    let discovery = loader.load_all(filter.as_ref())?;
    info!(
        fixtures = discovery.fixtures.len(),
        broken = discovery.broken.len(),
        "Fixtures discovered"
    );

    let started_at = Utc::now();
    let deadline = settings
        .deadline_ms
        .map(|ms| Deadline::arm(orchestrator.cancel_token(), Duration::from_millis(ms)));

    let mut progress = RunProgress::new(
        discovery.total(),
        ctx.is_rich() && args.format == ReportFormat::Text && should_show_progress(),
    );
    let verdicts = orchestrator.run(&discovery, |verdict| progress.record(verdict));
    progress.finish();
    drop(deadline);
    let finished_at = Utc::now();

    let report = Report::from_verdicts(verdicts);
    debug!(summary = %report.summary_line(), "Run complete");
    let document = ReportDocument {
        run: RunInfo {
            root: loader.root().display().to_string(),
            configs,
            started_at,
            finished_at,
        },
        report,
    };

    if let Some(path) = &args.report {
        document.write_to(path)?;
        info!(path = %path.display(), "Wrote report");
    }

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&document)?),
        ReportFormat::Csv => print!("{}", render_csv(&document.report)),
        ReportFormat::Text if ctx.is_json() => ctx.json_pretty(&document)?,
        ReportFormat::Text if ctx.is_rich() => render_rich(&document.report, ctx),
        ReportFormat::Text => ctx.print_plain(&render_text(&document.report)),
    }

    Ok(document.report.exit_code())
}

fn render_rich(report: &Report, ctx: &OutputContext) {
    let theme = ctx.theme();
    let mut table = VerdictTable::new(&report.verdicts, theme).title("Verdicts");
    if report.verdicts.len() > FULL_TABLE_LIMIT {
        table = table.failures_only();
    }
    ctx.render(&table.build());

    for verdict in &report.verdicts {
        if verdict.status != VerdictStatus::Mismatch {
            continue;
        }
        if let Some(detail) = &verdict.detail {
            ctx.section(&verdict.fixture_id);
            ctx.print_plain(detail);
            ctx.newline();
        }
    }

    if !report.timings.is_empty() {
        ctx.render(&TimingTable::new(&report.timings, theme).build());
    }
    ctx.render(&SummaryPanel::new("Summary", &report.summary, theme).build());

    if report.is_success() {
        ctx.success(&report.summary_line());
    } else {
        ctx.failure(&report.summary_line());
    }
}
