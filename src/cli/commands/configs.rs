//! `dh configs`: show resolved execution configs and run settings.

use super::load_layer;
use crate::backend::backend_for;
use crate::cli::ConfigsArgs;
use crate::config::{CliOverrides, HarnessSettings};
use crate::error::Result;
use crate::model::ExecutionConfig;
use crate::output::OutputContext;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Serialize)]
struct ConfigEntry<'a> {
    name: &'a str,
    selected: bool,
    /// Position in the comparison; 0 is the reference config.
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<usize>,
    mode: String,
    backend: &'a str,
    options: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct ConfigsOutput<'a> {
    concurrency: usize,
    timeout_ms: u64,
    retries: u32,
    max_output_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    deadline_ms: Option<u64>,
    parallel_configs: bool,
    configs: Vec<ConfigEntry<'a>>,
}

/// Execute the configs command.
///
/// Every selected config is resolved against its backend, so a
/// misconfigured backend fails here the same way it would fail `dh run`.
///
/// # Errors
///
/// Returns an error for unreadable config files, unknown or duplicate
/// config names, or a config its backend rejects.
pub fn execute(args: &ConfigsArgs, ctx: &OutputContext) -> Result<()> {
    let overrides = CliOverrides {
        select: args.configs.clone(),
        ..CliOverrides::default()
    };
    let layer = load_layer(&args.source, &overrides)?;
    let settings = HarnessSettings::from_layer(&layer)?;
    for config in &settings.selected {
        backend_for(config, settings.max_output_bytes)?;
    }

    let output = ConfigsOutput {
        concurrency: settings.concurrency,
        timeout_ms: settings.timeout_ms,
        retries: settings.retries,
        max_output_bytes: settings.max_output_bytes,
        deadline_ms: settings.deadline_ms,
        parallel_configs: settings.parallel_configs,
        configs: entries(&settings),
    };

    if ctx.is_json() {
        ctx.json_pretty(&output)?;
    } else {
        ctx.print_plain(&render(&output));
    }
    Ok(())
}

fn entries(settings: &HarnessSettings) -> Vec<ConfigEntry<'_>> {
    let position = |config: &ExecutionConfig| {
        settings
            .selected
            .iter()
            .position(|selected| selected.name == config.name)
    };
    settings
        .defined
        .iter()
        .map(|config| {
            let order = position(config);
            ConfigEntry {
                name: &config.name,
                selected: order.is_some(),
                order,
                mode: config.mode().as_str().to_string(),
                backend: config.backend(),
                options: &config.options,
            }
        })
        .collect()
}

fn render(output: &ConfigsOutput<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "concurrency={} timeout={}ms retries={} parallel-configs={}",
        output.concurrency, output.timeout_ms, output.retries, output.parallel_configs
    );
    if let Some(deadline) = output.deadline_ms {
        let _ = writeln!(out, "deadline={deadline}ms");
    }
    out.push('\n');

    for entry in &output.configs {
        let marker = match entry.order {
            Some(0) => "*",
            Some(_) => "+",
            None => " ",
        };
        let _ = writeln!(
            out,
            "{marker} {} (mode: {}, backend: {})",
            entry.name, entry.mode, entry.backend
        );
        for (key, value) in entry.options {
            let _ = writeln!(out, "      {key}: {value}");
        }
    }
    out.push_str("\n* reference  + compared\n");
    out
}
