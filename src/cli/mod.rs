//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Differential correctness harness for optimizing-compiler test fixtures
#[derive(Parser, Debug)]
#[command(name = "dh", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run fixtures under every selected config and compare their output
    Run(RunArgs),

    /// List discovered fixtures
    List(ListArgs),

    /// Show resolved execution configs
    Configs(ConfigsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Show version information
    Version,
}

/// Where fixtures and configuration come from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Fixture root directory
    #[arg(long, env = "DH_ROOT")]
    pub root: PathBuf,

    /// Extra config file layered over `<root>/harness.yaml`
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Execution configs to compare, first is the reference (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub configs: Option<Vec<String>>,

    /// Fixtures processed in parallel
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-execution timeout in milliseconds (fixtures may override)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Extra attempts for an execution that timed out
    #[arg(long)]
    pub retries: Option<u32>,

    /// Only run fixtures whose id matches this regex
    #[arg(long)]
    pub filter: Option<String>,

    /// Report format on stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Also write the JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Cancel the run after this many milliseconds
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    /// Run a fixture's configs one after another instead of concurrently
    #[arg(long)]
    pub sequential_configs: bool,

    /// Per-stream capture limit in bytes
    #[arg(long)]
    pub max_output_bytes: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only list fixtures whose id matches this regex
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Restrict to these configs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub configs: Option<Vec<String>>,
}

/// Report formats for `dh run`.
#[derive(ValueEnum, Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Arguments for the completions command.
#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    #[value(alias = "pwsh")]
    PowerShell,
    Elvish,
}
