//! Configuration management for `diffharness`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`DH_CONCURRENCY`, `DH_TIMEOUT_MS`, ...)
//! 3. Explicit config file (`--config <file>`)
//! 4. Root config (`<root>/harness.yaml`)
//! 5. Defaults
//!
//! Every source is flattened into a [`ConfigLayer`] of dotted keys, merged,
//! and then resolved into typed [`HarnessSettings`].

use crate::error::{HarnessError, Result};
use crate::model::ExecutionConfig;
use crate::orchestrator::RunOptions;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Config file looked up in the fixture root.
pub const ROOT_CONFIG_FILE: &str = "harness.yaml";

/// Default per-execution timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

const CONFIGS_PREFIX: &str = "configs.";

/// Top-level keys understood by the harness.
const HARNESS_KEYS: &[&str] = &[
    "concurrency",
    "timeout-ms",
    "retries",
    "select",
    "max-output-bytes",
    "deadline-ms",
    "parallel-configs",
];

/// A flattened configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents).map_err(|err| HarnessError::WithContext {
            context: format!("reading {}", path.display()),
            source: Box::new(err),
        })
    }

    /// Build a layer from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML.
    pub fn from_yaml_str(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let mut layer = Self::default();
        flatten_yaml(&value, "", &mut layer.values);
        layer.values = layer
            .values
            .into_iter()
            .map(|(key, value)| (normalize_key(&key), value))
            .collect();
        Ok(layer)
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(env::vars())
    }

    /// Build a layer from `DH_*` variables in `vars`.
    ///
    /// `DH_MODE` and `DH_CONFIG` are exported to fixtures and never read back.
    #[must_use]
    pub fn from_env_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();
        for (key, value) in vars {
            let Some(stripped) = key.strip_prefix("DH_") else {
                continue;
            };
            let normalized = normalize_key(stripped);
            if HARNESS_KEYS.contains(&normalized.as_str()) {
                layer.values.insert(normalized, value);
            }
        }
        layer
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Execution configs defined in this layer, keyed by name.
    #[must_use]
    pub fn execution_configs(&self) -> BTreeMap<String, ExecutionConfig> {
        let mut configs: BTreeMap<String, ExecutionConfig> = BTreeMap::new();
        for (key, value) in &self.values {
            let Some(rest) = key.strip_prefix(CONFIGS_PREFIX) else {
                continue;
            };
            let Some((name, option)) = rest.split_once('.') else {
                continue;
            };
            configs
                .entry(name.to_string())
                .or_insert_with(|| ExecutionConfig::new(name))
                .options
                .insert(option.to_string(), value.clone());
        }
        configs
    }
}

/// CLI overrides for config loading.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub retries: Option<u32>,
    pub select: Option<Vec<String>>,
    pub max_output_bytes: Option<usize>,
    pub deadline_ms: Option<u64>,
    pub sequential_configs: bool,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();
        let mut set = |key: &str, value: String| {
            layer.values.insert(key.to_string(), value);
        };

        if let Some(concurrency) = self.concurrency {
            set("concurrency", concurrency.to_string());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            set("timeout-ms", timeout_ms.to_string());
        }
        if let Some(retries) = self.retries {
            set("retries", retries.to_string());
        }
        if let Some(select) = &self.select {
            set("select", select.join(","));
        }
        if let Some(max) = self.max_output_bytes {
            set("max-output-bytes", max.to_string());
        }
        if let Some(deadline) = self.deadline_ms {
            set("deadline-ms", deadline.to_string());
        }
        if self.sequential_configs {
            set("parallel-configs", "false".to_string());
        }

        layer
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer
        .values
        .insert("timeout-ms".to_string(), DEFAULT_TIMEOUT_MS.to_string());
    layer.values.insert("retries".to_string(), "1".to_string());
    layer.values.insert(
        "max-output-bytes".to_string(),
        crate::backend::DEFAULT_MAX_OUTPUT_BYTES.to_string(),
    );
    layer
        .values
        .insert("parallel-configs".to_string(), "true".to_string());
    layer
}

/// Load configuration with the documented precedence.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or parsed, or if an
/// explicitly named file does not exist.
pub fn load_config(root: &Path, explicit: Option<&Path>, cli: &CliOverrides) -> Result<ConfigLayer> {
    let root_layer = ConfigLayer::from_yaml(&root.join(ROOT_CONFIG_FILE))?;
    let explicit_layer = match explicit {
        Some(path) if !path.is_file() => {
            return Err(HarnessError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Some(path) => ConfigLayer::from_yaml(path)?,
        None => ConfigLayer::default(),
    };

    let merged = ConfigLayer::merge_layers(&[
        default_config_layer(),
        root_layer,
        explicit_layer,
        ConfigLayer::from_env(),
        cli.as_layer(),
    ]);

    for key in merged.values.keys() {
        if !key.starts_with(CONFIGS_PREFIX) && !HARNESS_KEYS.contains(&key.as_str()) {
            warn!(key = %key, "Ignoring unknown config key");
        }
    }
    debug!(keys = merged.values.len(), "Configuration loaded");
    Ok(merged)
}

/// Fully resolved settings for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessSettings {
    pub concurrency: usize,
    pub timeout_ms: u64,
    pub retries: u32,
    pub max_output_bytes: usize,
    pub deadline_ms: Option<u64>,
    pub parallel_configs: bool,
    /// Every config defined, sorted by name.
    pub defined: Vec<ExecutionConfig>,
    /// Configs selected for this run, in selection order.
    pub selected: Vec<ExecutionConfig>,
}

impl HarnessSettings {
    /// Resolve and validate a merged layer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed numbers, unknown or
    /// duplicate selected configs, or an empty selection.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let concurrency = match parse_number::<usize>(layer, "concurrency")? {
            Some(0) => return Err(HarnessError::config("concurrency must be at least 1")),
            Some(n) => n,
            None => RunOptions::default().concurrency,
        };
        let timeout_ms = match parse_number::<u64>(layer, "timeout-ms")? {
            Some(0) => return Err(HarnessError::config("timeout-ms must be greater than zero")),
            Some(ms) => ms,
            None => DEFAULT_TIMEOUT_MS,
        };
        let retries = parse_number::<u32>(layer, "retries")?.unwrap_or(1);
        let max_output_bytes = parse_number::<usize>(layer, "max-output-bytes")?
            .unwrap_or(crate::backend::DEFAULT_MAX_OUTPUT_BYTES);
        let deadline_ms = parse_number::<u64>(layer, "deadline-ms")?.filter(|ms| *ms > 0);
        let parallel_configs = match layer.get("parallel-configs") {
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                HarnessError::config(format!("parallel-configs: expected a boolean, got '{raw}'"))
            })?,
            None => true,
        };

        let defined_map = layer.execution_configs();
        let known: Vec<String> = defined_map.keys().cloned().collect();
        let selected = match layer.get("select") {
            Some(raw) => select_configs(&split_list(raw), &defined_map, &known)?,
            None => defined_map.values().cloned().collect(),
        };
        if selected.is_empty() {
            return Err(HarnessError::NoConfigs);
        }

        Ok(Self {
            concurrency,
            timeout_ms,
            retries,
            max_output_bytes,
            deadline_ms,
            parallel_configs,
            defined: defined_map.into_values().collect(),
            selected,
        })
    }

    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            concurrency: self.concurrency,
            timeout_retries: self.retries,
            parallel_configs: self.parallel_configs,
        }
    }

    #[must_use]
    pub fn selected_names(&self) -> Vec<String> {
        self.selected.iter().map(|c| c.name.clone()).collect()
    }
}

fn select_configs(
    names: &[String],
    defined: &BTreeMap<String, ExecutionConfig>,
    known: &[String],
) -> Result<Vec<ExecutionConfig>> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| {
            if !seen.insert(name.as_str()) {
                return Err(HarnessError::DuplicateConfig { name: name.clone() });
            }
            defined
                .get(name)
                .cloned()
                .ok_or_else(|| HarnessError::UnknownConfig {
                    name: name.clone(),
                    known: known.to_vec(),
                })
        })
        .collect()
}

/// Split a comma-separated list, dropping blanks.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(layer: &ConfigLayer, key: &str) -> Result<Option<T>> {
    layer
        .get(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                HarnessError::config(format!("{key}: expected a non-negative integer, got '{raw}'"))
            })
        })
        .transpose()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Lowercase top-level keys with `_` mapped to `-`; config options keep
/// their case so `env.<NAME>` survives.
fn normalize_key(key: &str) -> String {
    if key.starts_with(CONFIGS_PREFIX) {
        return key.trim().to_string();
    }
    key.trim().to_lowercase().replace('_', "-")
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = yaml_scalar_to_string(key) else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            // Argument templates are whitespace-separated; everything else is a list.
            let separator = if prefix.ends_with(".args") { " " } else { "," };
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(separator);
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(v) => Some(v.to_string()),
        serde_yaml::Value::String(v) => Some(v.clone()),
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
        serde_yaml::Value::Null | serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => None,
    }
}

/// Path of the root config file for `root`.
#[must_use]
pub fn root_config_path(root: &Path) -> PathBuf {
    root.join(ROOT_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
concurrency: 4
timeout_ms: 2500
select: [baseline, optimized]
configs:
  baseline:
    command: dalvikvm
    args: "-Xint -cp {fixture_dir} {entry}"
    mode: interpreted
  optimized:
    command: dalvikvm
    args: ["-Xcompiler-option", "--compiler-filter=speed", "{entry}"]
    env:
      ART_OPT: "1"
"#;

    fn layer() -> ConfigLayer {
        ConfigLayer::merge_layers(&[
            default_config_layer(),
            ConfigLayer::from_yaml_str(SAMPLE).unwrap(),
        ])
    }

    #[test]
    fn yaml_flattens_configs() {
        let configs = layer().execution_configs();
        let optimized = &configs["optimized"];
        assert_eq!(optimized.option("command"), Some("dalvikvm"));
        assert_eq!(
            optimized.option("args"),
            Some("-Xcompiler-option --compiler-filter=speed {entry}")
        );
        assert_eq!(optimized.option("env.ART_OPT"), Some("1"));
    }

    #[test]
    fn settings_resolve() {
        let settings = HarnessSettings::from_layer(&layer()).unwrap();
        assert_eq!(settings.concurrency, 4);
        assert_eq!(settings.timeout_ms, 2500);
        assert_eq!(settings.retries, 1);
        assert!(settings.parallel_configs);
        assert_eq!(settings.selected_names(), vec!["baseline", "optimized"]);
    }

    #[test]
    fn cli_overrides_win() {
        let cli = CliOverrides {
            timeout_ms: Some(100),
            select: Some(vec!["optimized".to_string(), "baseline".to_string()]),
            sequential_configs: true,
            ..CliOverrides::default()
        };
        let merged = ConfigLayer::merge_layers(&[layer(), cli.as_layer()]);
        let settings = HarnessSettings::from_layer(&merged).unwrap();
        assert_eq!(settings.timeout_ms, 100);
        assert!(!settings.parallel_configs);
        assert_eq!(settings.selected_names(), vec!["optimized", "baseline"]);
    }

    #[test]
    fn env_vars_only_harness_keys() {
        let layer = ConfigLayer::from_env_vars([
            ("DH_CONCURRENCY".to_string(), "3".to_string()),
            ("DH_TIMEOUT_MS".to_string(), "50".to_string()),
            ("DH_MODE".to_string(), "optimized".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ]);
        assert_eq!(layer.get("concurrency"), Some("3"));
        assert_eq!(layer.get("timeout-ms"), Some("50"));
        assert_eq!(layer.values.len(), 2);
    }

    #[test]
    fn unknown_selected_config() {
        let cli = CliOverrides {
            select: Some(vec!["optimised".to_string()]),
            ..CliOverrides::default()
        };
        let merged = ConfigLayer::merge_layers(&[layer(), cli.as_layer()]);
        let err = HarnessSettings::from_layer(&merged).unwrap_err();
        assert!(
            matches!(err, HarnessError::UnknownConfig { ref name, ref known } if name == "optimised" && known.len() == 2)
        );
    }

    #[test]
    fn duplicate_selected_config() {
        let cli = CliOverrides {
            select: Some(vec!["baseline".to_string(), "baseline".to_string()]),
            ..CliOverrides::default()
        };
        let merged = ConfigLayer::merge_layers(&[layer(), cli.as_layer()]);
        let err = HarnessSettings::from_layer(&merged).unwrap_err();
        assert!(matches!(err, HarnessError::DuplicateConfig { .. }));
    }

    #[test]
    fn no_configs_defined() {
        let err = HarnessSettings::from_layer(&default_config_layer()).unwrap_err();
        assert!(matches!(err, HarnessError::NoConfigs));
    }

    #[test]
    fn bad_numbers_rejected() {
        let bad = ConfigLayer::from_yaml_str("concurrency: many\n").unwrap();
        let merged = ConfigLayer::merge_layers(&[layer(), bad]);
        let err = HarnessSettings::from_layer(&merged).unwrap_err();
        assert!(err.to_string().contains("concurrency"));

        let zero = ConfigLayer::from_yaml_str("timeout-ms: 0\n").unwrap();
        let merged = ConfigLayer::merge_layers(&[layer(), zero]);
        assert!(HarnessSettings::from_layer(&merged).is_err());
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let err = load_config(
            temp.path(),
            Some(&temp.path().join("nope.yaml")),
            &CliOverrides::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn root_file_is_loaded() {
        let temp = TempDir::new().unwrap();
        fs::write(root_config_path(temp.path()), SAMPLE).unwrap();
        let merged = load_config(temp.path(), None, &CliOverrides::default()).unwrap();
        assert_eq!(merged.execution_configs().len(), 2);
    }

    #[test]
    fn parse_bool_values() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
