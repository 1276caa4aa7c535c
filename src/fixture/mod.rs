//! Fixture discovery.
//!
//! A fixture is a directory under the root holding `fixture.yaml`,
//! `Main.java` or `src/Main.java`. Discovery never descends into a fixture
//! and walks entries in file-name order, so scanning an unchanged tree twice
//! yields the same sequence.
//!
//! A fixture whose metadata is malformed produces a [`DiscoveryError`] for
//! that fixture only; the rest of the scan continues.

use crate::error::{HarnessError, Result};
use crate::model::FixtureDescriptor;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Manifest file name inside a fixture directory.
pub const MANIFEST_FILE: &str = "fixture.yaml";

const SOURCE_CANDIDATES: [&str; 2] = ["Main.java", "src/Main.java"];

/// A single fixture could not be turned into a descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("fixture '{fixture_id}' has no entry point (no `entry_point` and no `static void main(` in {})", path.display())]
    MissingEntryPoint { fixture_id: String, path: PathBuf },

    #[error("fixture '{fixture_id}': `args` must be a list of scalars ({reason})")]
    MalformedArgs {
        fixture_id: String,
        path: PathBuf,
        reason: String,
    },

    #[error("fixture '{fixture_id}': cannot parse {}: {reason}", path.display())]
    MalformedManifest {
        fixture_id: String,
        path: PathBuf,
        reason: String,
    },

    #[error("fixture '{fixture_id}': `timeout_ms` must be greater than zero")]
    InvalidTimeout { fixture_id: String, path: PathBuf },

    #[error("fixture '{fixture_id}': cannot read {}: {reason}", path.display())]
    Unreadable {
        fixture_id: String,
        path: PathBuf,
        reason: String,
    },
}

impl DiscoveryError {
    #[must_use]
    pub fn fixture_id(&self) -> &str {
        match self {
            Self::MissingEntryPoint { fixture_id, .. }
            | Self::MalformedArgs { fixture_id, .. }
            | Self::MalformedManifest { fixture_id, .. }
            | Self::InvalidTimeout { fixture_id, .. }
            | Self::Unreadable { fixture_id, .. } => fixture_id,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::MissingEntryPoint { path, .. }
            | Self::MalformedArgs { path, .. }
            | Self::MalformedManifest { path, .. }
            | Self::InvalidTimeout { path, .. }
            | Self::Unreadable { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    id: Option<String>,
    entry_point: Option<String>,
    args: Option<serde_yaml::Value>,
    timeout_ms: Option<u64>,
    #[serde(default)]
    nondeterministic_expected: bool,
    category: Option<String>,
}

/// Everything discovery found under a root.
#[derive(Debug, Default)]
pub struct Discovery {
    pub fixtures: Vec<FixtureDescriptor>,
    /// Fixtures that could not be loaded; each becomes an ERROR verdict.
    pub broken: Vec<DiscoveryError>,
}

impl Discovery {
    #[must_use]
    pub fn total(&self) -> usize {
        self.fixtures.len() + self.broken.len()
    }
}

/// Walks a fixture root and produces descriptors.
#[derive(Debug, Clone)]
pub struct FixtureLoader {
    root: PathBuf,
    default_timeout_ms: u64,
}

impl FixtureLoader {
    /// Create a loader for `root`.
    ///
    /// # Errors
    ///
    /// Returns `RootNotFound` if `root` is not an existing directory.
    pub fn new(root: impl Into<PathBuf>, default_timeout_ms: u64) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(HarnessError::RootNotFound { path: root });
        }
        Ok(Self {
            root,
            default_timeout_ms: default_timeout_ms.max(1),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily scan the root. Calling `scan` again restarts from the top.
    #[must_use]
    pub fn scan(&self) -> FixtureScan<'_> {
        FixtureScan {
            loader: self,
            walker: WalkDir::new(&self.root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter(),
        }
    }

    /// Scan the whole root, keeping fixtures whose id matches `filter`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateFixture` when two fixture directories resolve to
    /// the same id.
    pub fn load_all(&self, filter: Option<&Regex>) -> Result<Discovery> {
        let mut discovery = Discovery::default();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for item in self.scan() {
            let (id, dir) = match &item {
                Ok(fixture) => (fixture.id.clone(), fixture.dir.clone()),
                Err(err) => (err.fixture_id().to_string(), err.path().to_path_buf()),
            };
            if filter.is_some_and(|re| !re.is_match(&id)) {
                continue;
            }
            if let Some(first) = seen.get(&id) {
                return Err(HarnessError::DuplicateFixture {
                    id,
                    first: first.clone(),
                    second: dir,
                });
            }
            seen.insert(id, dir);

            match item {
                Ok(fixture) => discovery.fixtures.push(fixture),
                Err(err) => {
                    warn!(fixture = %err.fixture_id(), error = %err, "Fixture could not be loaded");
                    discovery.broken.push(err);
                }
            }
        }

        debug!(
            root = %self.root.display(),
            fixtures = discovery.fixtures.len(),
            broken = discovery.broken.len(),
            "Discovery complete"
        );
        Ok(discovery)
    }

    fn load_fixture(&self, dir: &Path) -> std::result::Result<FixtureDescriptor, DiscoveryError> {
        let dir_id = dir_name(dir);
        let manifest_path = dir.join(MANIFEST_FILE);

        let manifest = if manifest_path.is_file() {
            read_manifest(&manifest_path, &dir_id)?
        } else {
            Manifest::default()
        };

        let id = manifest
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(dir_id);

        let args = match &manifest.args {
            Some(value) => parse_args(value).map_err(|reason| DiscoveryError::MalformedArgs {
                fixture_id: id.clone(),
                path: manifest_path.clone(),
                reason,
            })?,
            None => Vec::new(),
        };

        let timeout_ms = match manifest.timeout_ms {
            Some(0) => {
                return Err(DiscoveryError::InvalidTimeout {
                    fixture_id: id,
                    path: manifest_path,
                });
            }
            Some(ms) => ms,
            None => self.default_timeout_ms,
        };

        let entry_point = match manifest.entry_point.filter(|e| !e.trim().is_empty()) {
            Some(entry) => entry,
            None => resolve_entry_point(dir, &id)?,
        };

        let category = manifest.category.or_else(|| self.default_category(dir));

        Ok(FixtureDescriptor {
            id,
            entry_point,
            args,
            timeout_ms,
            nondeterministic_expected: manifest.nondeterministic_expected,
            category,
            dir: dir.to_path_buf(),
        })
    }

    fn default_category(&self, dir: &Path) -> Option<String> {
        let parent = dir.parent()?;
        if parent == self.root || !parent.starts_with(&self.root) {
            return None;
        }
        parent
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

/// Restartable, lazy walk over a fixture root.
pub struct FixtureScan<'a> {
    loader: &'a FixtureLoader,
    walker: walkdir::IntoIter,
}

impl Iterator for FixtureScan<'_> {
    type Item = std::result::Result<FixtureDescriptor, DiscoveryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    return Some(Err(DiscoveryError::Unreadable {
                        fixture_id: dir_name(&path),
                        path,
                        reason: err.to_string(),
                    }));
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }
            if entry.depth() > 0 && is_hidden(entry.file_name()) {
                self.walker.skip_current_dir();
                continue;
            }
            if is_fixture_dir(entry.path()) {
                self.walker.skip_current_dir();
                return Some(self.loader.load_fixture(entry.path()));
            }
        }
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn is_fixture_dir(dir: &Path) -> bool {
    dir.join(MANIFEST_FILE).is_file()
        || SOURCE_CANDIDATES
            .iter()
            .any(|candidate| dir.join(candidate).is_file())
}

fn dir_name(dir: &Path) -> String {
    dir.file_name().map_or_else(
        || dir.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn read_manifest(path: &Path, dir_id: &str) -> std::result::Result<Manifest, DiscoveryError> {
    let contents = fs::read_to_string(path).map_err(|err| DiscoveryError::Unreadable {
        fixture_id: dir_id.to_string(),
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    if contents.trim().is_empty() {
        return Ok(Manifest::default());
    }
    serde_yaml::from_str(&contents).map_err(|err| DiscoveryError::MalformedManifest {
        fixture_id: dir_id.to_string(),
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

fn parse_args(value: &serde_yaml::Value) -> std::result::Result<Vec<String>, String> {
    use serde_yaml::Value;

    let Value::Sequence(items) = value else {
        return Err(format!("expected a list, found {}", yaml_kind(value)));
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(format!("element {idx} is a {}", yaml_kind(other))),
        })
        .collect()
}

const fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    use serde_yaml::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn resolve_entry_point(dir: &Path, id: &str) -> std::result::Result<String, DiscoveryError> {
    let Some(source_path) = SOURCE_CANDIDATES
        .iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_file())
    else {
        return Err(DiscoveryError::MissingEntryPoint {
            fixture_id: id.to_string(),
            path: dir.to_path_buf(),
        });
    };

    let source = fs::read_to_string(&source_path).map_err(|err| DiscoveryError::Unreadable {
        fixture_id: id.to_string(),
        path: source_path.clone(),
        reason: err.to_string(),
    })?;

    if !source.contains("static void main(") {
        return Err(DiscoveryError::MissingEntryPoint {
            fixture_id: id.to_string(),
            path: source_path,
        });
    }

    Ok(match java_package(&source) {
        Some(package) => format!("{package}.Main"),
        None => "Main".to_string(),
    })
}

/// Package named by the first `package x.y.z;` declaration.
fn java_package(source: &str) -> Option<&str> {
    source.lines().find_map(|line| {
        line.trim()
            .strip_prefix("package ")
            .and_then(|rest| rest.trim().strip_suffix(';'))
            .map(str::trim)
            .filter(|pkg| !pkg.is_empty())
    })
}
