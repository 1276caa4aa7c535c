//! Core data types for `diffharness`.
//!
//! This module defines the records that flow through a harness run:
//! - `FixtureDescriptor` - One test program, immutable once discovered
//! - `ExecutionConfig` - A named execution configuration, shared read-only
//! - `ExecutionResult` - Captured output of one (fixture, config) execution
//! - `Verdict` - The comparison outcome for one fixture
//! - `FixtureState` - Per-fixture lifecycle inside the orchestrator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Static metadata about one test program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureDescriptor {
    /// Unique identifier within a run.
    pub id: String,
    /// Fully-qualified entry point (e.g. `OptimizationTests.LoopUnrolling.Foo.Main`).
    pub entry_point: String,
    /// Ordered command-line arguments passed after the entry point.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Per-execution timeout in milliseconds (always > 0).
    pub timeout_ms: u64,
    /// Output is allowed to diverge; the fixture is always SKIPPED.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nondeterministic_expected: bool,
    /// Optimization category the fixture belongs to, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Directory holding the fixture sources/binaries.
    pub dir: PathBuf,
}

impl FixtureDescriptor {
    /// Timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `category/id` when the fixture has a category, otherwise just the id.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.category {
            Some(category) => format!("{category}/{}", self.id),
            None => self.id.clone(),
        }
    }
}

/// Compiler/runtime configuration a config stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Baseline,
    Optimized,
    Interpreted,
    Compiled,
    #[serde(untagged)]
    Custom(String),
}

impl ExecutionMode {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Baseline => "baseline",
            Self::Optimized => "optimized",
            Self::Interpreted => "interpreted",
            Self::Compiled => "compiled",
            Self::Custom(value) => value,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baseline" => Ok(Self::Baseline),
            "optimized" | "optimised" | "opt" => Ok(Self::Optimized),
            "interpreted" | "interpreter" | "int" => Ok(Self::Interpreted),
            "compiled" | "aot" => Ok(Self::Compiled),
            other => Ok(Self::Custom(other.to_string())),
        }
    }
}

/// A named execution configuration, defined once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Unique name among the run's configs.
    pub name: String,
    /// Backend-specific options.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ExecutionConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Mode from the `mode` option, falling back to the config name.
    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        let raw = self.option("mode").unwrap_or(&self.name);
        match raw.parse() {
            Ok(mode) => mode,
            Err(never) => match never {},
        }
    }

    /// Backend kind, `process` unless overridden.
    #[must_use]
    pub fn backend(&self) -> &str {
        self.option("backend").unwrap_or("process")
    }

    /// `env.<NAME>` options as environment pairs.
    pub fn env_vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options
            .iter()
            .filter_map(|(key, value)| key.strip_prefix("env.").map(|name| (name, value.as_str())))
    }
}

/// Captured outcome of running one fixture under one config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub fixture_id: String,
    pub config_name: String,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Observed exit code; `128 + signal` when killed by a signal.
    pub exit_code: i32,
    pub signal: Option<i32>,
    pub duration_ms: u64,
    pub timed_out: bool,
    pub crashed: bool,
    pub cancelled: bool,
    pub stdout_truncated: bool,
    /// The process could not be launched at all.
    pub launch_error: Option<String>,
    /// Stable description of an abnormal exit, e.g. `exit 1: java.lang.ArithmeticException`.
    pub crash_signature: Option<String>,
}

impl ExecutionResult {
    /// Empty result for a (fixture, config) pair; backends fill in the rest.
    #[must_use]
    pub fn new(fixture_id: impl Into<String>, config_name: impl Into<String>) -> Self {
        Self {
            fixture_id: fixture_id.into(),
            config_name: config_name.into(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: 0,
            signal: None,
            duration_ms: 0,
            timed_out: false,
            crashed: false,
            cancelled: false,
            stdout_truncated: false,
            launch_error: None,
            crash_signature: None,
        }
    }

    #[must_use]
    pub fn launch_failed(
        fixture_id: impl Into<String>,
        config_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            exit_code: -1,
            launch_error: Some(reason.into()),
            ..Self::new(fixture_id, config_name)
        }
    }

    #[must_use]
    pub fn cancelled(fixture_id: impl Into<String>, config_name: impl Into<String>) -> Self {
        Self {
            cancelled: true,
            ..Self::new(fixture_id, config_name)
        }
    }

    /// Short human description of how the execution ended.
    #[must_use]
    pub fn outcome(&self) -> String {
        if let Some(reason) = &self.launch_error {
            return format!("launch failed ({reason})");
        }
        if self.cancelled {
            return "cancelled".to_string();
        }
        if self.timed_out {
            return format!("timed out after {}ms", self.duration_ms);
        }
        match &self.crash_signature {
            Some(signature) if self.crashed => format!("crashed ({signature})"),
            _ => format!("exit {}", self.exit_code),
        }
    }
}

/// Per-config run record kept in a verdict for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub config: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub timed_out: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub crashed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub cancelled: bool,
    pub attempts: u32,
    pub stdout_bytes: usize,
    pub stdout_sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crash_signature: Option<String>,
}

impl RunSummary {
    #[must_use]
    pub fn from_result(result: &ExecutionResult, attempts: u32) -> Self {
        Self {
            config: result.config_name.clone(),
            exit_code: result.exit_code,
            duration_ms: result.duration_ms,
            timed_out: result.timed_out,
            crashed: result.crashed,
            cancelled: result.cancelled,
            attempts,
            stdout_bytes: result.stdout.len(),
            stdout_sha256: crate::util::sha256_hex(&result.stdout),
            crash_signature: result.crash_signature.clone(),
        }
    }
}

/// Comparison outcome for one fixture.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictStatus {
    Pass,
    Mismatch,
    Error,
    Timeout,
    Skipped,
}

impl VerdictStatus {
    pub const ALL: [Self; 5] = [
        Self::Pass,
        Self::Mismatch,
        Self::Error,
        Self::Timeout,
        Self::Skipped,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Mismatch => "MISMATCH",
            Self::Error => "ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Skipped => "SKIPPED",
        }
    }

    /// Whether this status makes the run exit non-zero.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Mismatch | Self::Error | Self::Timeout)
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One verdict per fixture per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub fixture_id: String,
    pub status: VerdictStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<RunSummary>,
}

impl Verdict {
    #[must_use]
    pub fn new(fixture_id: impl Into<String>, status: VerdictStatus) -> Self {
        Self {
            fixture_id: fixture_id.into(),
            status,
            detail: None,
            runs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn with_runs(mut self, runs: Vec<RunSummary>) -> Self {
        self.runs = runs;
        self
    }
}

/// Lifecycle of one fixture inside the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureState {
    Discovered,
    /// Executions in flight; `remaining` have not reported yet.
    Running { remaining: usize },
    AwaitingComparison,
    Done(VerdictStatus),
}

impl FixtureState {
    /// Executions were launched for `configs` configs.
    #[must_use]
    pub fn start(self, configs: usize) -> Self {
        match self {
            Self::Discovered if configs == 0 => Self::AwaitingComparison,
            Self::Discovered => Self::Running { remaining: configs },
            other => other,
        }
    }

    /// One execution produced its result.
    #[must_use]
    pub fn execution_finished(self) -> Self {
        match self {
            Self::Running { remaining } if remaining <= 1 => Self::AwaitingComparison,
            Self::Running { remaining } => Self::Running {
                remaining: remaining - 1,
            },
            other => other,
        }
    }

    /// Comparison produced a verdict.
    #[must_use]
    pub fn compared(self, status: VerdictStatus) -> Self {
        match self {
            Self::AwaitingComparison => Self::Done(status),
            other => other,
        }
    }

    /// Short-circuit to a terminal state (discovery error, cancellation).
    #[must_use]
    pub const fn abort(status: VerdictStatus) -> Self {
        Self::Done(status)
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

impl fmt::Display for FixtureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovered => write!(f, "DISCOVERED"),
            Self::Running { remaining } => write!(f, "RUNNING({remaining} pending)"),
            Self::AwaitingComparison => write!(f, "AWAITING_COMPARISON"),
            Self::Done(status) => write!(f, "DONE({status})"),
        }
    }
}
