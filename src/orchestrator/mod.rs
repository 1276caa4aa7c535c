//! Schedules fixtures across execution configs and collects verdicts.
//!
//! Fixtures are fed over a channel to a fixed pool of scoped worker threads.
//! Within one fixture the per-config executions may run on their own scoped
//! threads; the comparator only runs once every config has reported.

use crate::backend::{CancelToken, ExecutionBackend, backend_for};
use crate::compare::Comparator;
use crate::error::{HarnessError, Result};
use crate::fixture::Discovery;
use crate::model::{
    ExecutionConfig, ExecutionResult, FixtureDescriptor, FixtureState, RunSummary, Verdict,
    VerdictStatus,
};
use crossbeam::channel;
use std::collections::HashSet;
use std::thread;
use tracing::{debug, info, warn};

/// Scheduling knobs for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Fixtures processed at once.
    pub concurrency: usize,
    /// Extra attempts for an execution that timed out.
    pub timeout_retries: u32,
    /// Run a fixture's configs concurrently.
    pub parallel_configs: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            timeout_retries: 1,
            parallel_configs: true,
        }
    }
}

struct Lane {
    config: ExecutionConfig,
    backend: Box<dyn ExecutionBackend>,
}

/// Drives fixtures through execution and comparison.
pub struct Orchestrator {
    lanes: Vec<Lane>,
    comparator: Comparator,
    options: RunOptions,
    cancel: CancelToken,
}

impl Orchestrator {
    /// Build an orchestrator, resolving a backend for every config.
    ///
    /// # Errors
    ///
    /// Fails when no config is given, a name repeats, or a config's backend
    /// is unknown or misconfigured.
    pub fn new(
        configs: Vec<ExecutionConfig>,
        options: RunOptions,
        max_output_bytes: usize,
    ) -> Result<Self> {
        let lanes = configs
            .into_iter()
            .map(|config| {
                let backend = backend_for(&config, max_output_bytes)?;
                Ok((config, backend))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::with_backends(lanes, options)
    }

    /// Build an orchestrator from explicit (config, backend) pairs.
    ///
    /// # Errors
    ///
    /// Fails when `lanes` is empty or a config name repeats.
    pub fn with_backends(
        lanes: Vec<(ExecutionConfig, Box<dyn ExecutionBackend>)>,
        options: RunOptions,
    ) -> Result<Self> {
        if lanes.is_empty() {
            return Err(HarnessError::NoConfigs);
        }
        let mut seen = HashSet::new();
        for (config, _) in &lanes {
            if !seen.insert(config.name.as_str()) {
                return Err(HarnessError::DuplicateConfig {
                    name: config.name.clone(),
                });
            }
        }
        if lanes.len() == 1 {
            warn!(config = %lanes[0].0.name, "Only one execution config selected; every fixture will trivially agree");
        }

        let comparator = Comparator::new(lanes.iter().map(|(config, _)| config.name.clone()));
        Ok(Self {
            lanes: lanes
                .into_iter()
                .map(|(config, backend)| Lane { config, backend })
                .collect(),
            comparator,
            options: RunOptions {
                concurrency: options.concurrency.max(1),
                ..options
            },
            cancel: CancelToken::new(),
        })
    }

    /// Token that cancels this orchestrator's runs.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn config_names(&self) -> &[String] {
        self.comparator.configs()
    }

    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run every discovered fixture and return one verdict per fixture.
    ///
    /// `on_verdict` sees each verdict as soon as it is final. Verdicts come
    /// back in completion order.
    pub fn run<F>(&self, discovery: &Discovery, mut on_verdict: F) -> Vec<Verdict>
    where
        F: FnMut(&Verdict),
    {
        let mut verdicts = Vec::with_capacity(discovery.total());

        for broken in &discovery.broken {
            let verdict = Verdict::new(broken.fixture_id(), VerdictStatus::Error)
                .with_detail(broken.to_string());
            debug!(fixture = %verdict.fixture_id, state = %FixtureState::abort(VerdictStatus::Error), "Discovery error");
            on_verdict(&verdict);
            verdicts.push(verdict);
        }

        let (job_tx, job_rx) = channel::unbounded::<&FixtureDescriptor>();
        let (done_tx, done_rx) = channel::unbounded::<Verdict>();
        for fixture in &discovery.fixtures {
            // Receiver is alive until the scope below ends.
            let _ = job_tx.send(fixture);
        }
        drop(job_tx);

        let workers = self.options.concurrency.min(discovery.fixtures.len()).max(1);
        info!(
            fixtures = discovery.fixtures.len(),
            configs = self.lanes.len(),
            workers,
            "Starting run"
        );

        thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for fixture in &job_rx {
                        let verdict = if self.cancel.is_cancelled() {
                            debug!(worker, fixture = %fixture.id, "Skipping after cancellation");
                            Verdict::new(&fixture.id, VerdictStatus::Skipped)
                                .with_detail("run cancelled before fixture started")
                        } else {
                            self.run_fixture(fixture)
                        };
                        if done_tx.send(verdict).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(done_tx);

            for verdict in &done_rx {
                on_verdict(&verdict);
                verdicts.push(verdict);
            }
        });

        verdicts
    }

    /// Execute one fixture under every config and compare the results.
    #[must_use]
    pub fn run_fixture(&self, fixture: &FixtureDescriptor) -> Verdict {
        let mut state = FixtureState::Discovered;
        debug!(fixture = %fixture.id, %state, "Fixture state");
        state = state.start(self.lanes.len());
        debug!(fixture = %fixture.id, %state, "Fixture state");

        let outcomes: Vec<(ExecutionResult, u32)> =
            if self.options.parallel_configs && self.lanes.len() > 1 {
                thread::scope(|scope| {
                    let handles: Vec<_> = self
                        .lanes
                        .iter()
                        .map(|lane| scope.spawn(move || self.execute_with_retry(fixture, lane)))
                        .collect();
                    handles
                        .into_iter()
                        .zip(&self.lanes)
                        .map(|(handle, lane)| {
                            handle.join().unwrap_or_else(|_| {
                                let reason = "execution thread panicked";
                                (
                                    ExecutionResult::launch_failed(&fixture.id, &lane.config.name, reason),
                                    1,
                                )
                            })
                        })
                        .collect()
                })
            } else {
                self.lanes
                    .iter()
                    .map(|lane| self.execute_with_retry(fixture, lane))
                    .collect()
            };

        for (result, _) in &outcomes {
            state = state.execution_finished();
            debug!(fixture = %fixture.id, config = %result.config_name, %state, "Fixture state");
        }

        let results: Vec<ExecutionResult> = outcomes.iter().map(|(r, _)| r.clone()).collect();
        let runs = outcomes
            .iter()
            .map(|(result, attempts)| RunSummary::from_result(result, *attempts))
            .collect();
        let verdict = self.comparator.compare(fixture, &results).with_runs(runs);

        state = state.compared(verdict.status);
        debug!(fixture = %fixture.id, %state, "Fixture state");
        verdict
    }

    fn execute_with_retry(&self, fixture: &FixtureDescriptor, lane: &Lane) -> (ExecutionResult, u32) {
        let mut attempts = 1;
        loop {
            let result = lane.backend.run(fixture, &lane.config, &self.cancel);
            if result.timed_out
                && attempts <= self.options.timeout_retries
                && !self.cancel.is_cancelled()
            {
                warn!(
                    fixture = %fixture.id,
                    config = %lane.config.name,
                    attempt = attempts,
                    "Execution timed out, retrying"
                );
                attempts += 1;
                continue;
            }
            return (result, attempts);
        }
    }
}
