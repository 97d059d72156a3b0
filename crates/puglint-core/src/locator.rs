//! Locating the installed linter package
//!
//! The linter is never bundled; it is resolved from the user's project the
//! way node would resolve it, falling back to a global install. Not finding
//! it is an expected outcome (the user may not have opted in) and is
//! reported as `None` rather than an error.

use crate::config::{MANIFEST_FIELDS, MANIFEST_FILE_NAME};
use crate::error::PuglintError;
use crate::result::{Result, ResultExt};
use regex::Regex;
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Package name of the linter
pub const PUG_LINT_PACKAGE: &str = "pug-lint";

static CONFIG_FILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(jade|pug)-lint(rc|rc\.js|rc\.json|\.json)$").expect("valid config file pattern")
});

/// How a module was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// `node_modules` of the start directory or one of its ancestors
    Local,
    /// An entry of `NODE_PATH`
    NodePath,
    /// A global install reachable through `PATH`
    Global,
}

/// Root directory of an installed package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePath {
    root: PathBuf,
    origin: ModuleOrigin,
}

impl ModulePath {
    pub fn new(root: impl Into<PathBuf>, origin: ModuleOrigin) -> Self {
        Self {
            root: root.into(),
            origin,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn origin(&self) -> ModuleOrigin {
        self.origin
    }
}

/// Finds installed packages
#[derive(Debug, Clone)]
pub struct ModuleLocator {
    search_global: bool,
    node_path: Option<OsString>,
}

impl Default for ModuleLocator {
    fn default() -> Self {
        Self {
            search_global: true,
            node_path: std::env::var_os("NODE_PATH"),
        }
    }
}

impl ModuleLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the `NODE_PATH` and global install fallbacks
    pub fn with_global_search(mut self, enabled: bool) -> Self {
        self.search_global = enabled;
        self
    }

    /// Replace the `NODE_PATH` value taken from the environment
    pub fn with_node_path(mut self, node_path: Option<OsString>) -> Self {
        self.node_path = node_path;
        self
    }

    /// Find `package` starting from `start_dir`
    pub fn locate(&self, package: &str, start_dir: &Path) -> Option<ModulePath> {
        for dir in start_dir.ancestors() {
            let candidate = dir.join("node_modules").join(package);
            if is_package_root(&candidate, package) {
                tracing::debug!("Found {} at {}", package, candidate.display());
                return Some(ModulePath::new(candidate, ModuleOrigin::Local));
            }
        }

        if !self.search_global {
            return None;
        }

        if let Some(node_path) = &self.node_path {
            for entry in std::env::split_paths(node_path) {
                let candidate = entry.join(package);
                if is_package_root(&candidate, package) {
                    tracing::debug!("Found {} on NODE_PATH at {}", package, candidate.display());
                    return Some(ModulePath::new(candidate, ModuleOrigin::NodePath));
                }
            }
        }

        let located = locate_global(package);
        if located.is_none() {
            tracing::debug!("{} not found from {}", package, start_dir.display());
        }
        located
    }

    /// Like [`ModuleLocator::locate`], but as an error for callers that need one
    pub fn require(&self, package: &str, start_dir: &Path) -> Result<ModulePath> {
        self.locate(package, start_dir)
            .ok_or_else(|| PuglintError::module_not_found(package, start_dir))
    }
}

fn locate_global(package: &str) -> Option<ModulePath> {
    let executable = which::which(package).ok()?;

    // npm links `<prefix>/bin/<pkg>` into `<prefix>/lib/node_modules/<pkg>/...`
    if let Ok(target) = fs::canonicalize(&executable) {
        for dir in target.ancestors().skip(1) {
            if is_package_root(dir, package) {
                return Some(ModulePath::new(dir, ModuleOrigin::Global));
            }
        }
    }

    // shims that are not symlinks (Windows `.cmd`, some version managers)
    let bin_dir = executable.parent()?;
    let candidates = [
        bin_dir.join("node_modules").join(package),
        bin_dir.parent()?.join("lib").join("node_modules").join(package),
    ];
    candidates
        .into_iter()
        .find(|candidate| is_package_root(candidate, package))
        .map(|root| ModulePath::new(root, ModuleOrigin::Global))
}

/// Whether `dir` holds a `package.json` naming `package`
fn is_package_root(dir: &Path, package: &str) -> bool {
    let manifest = dir.join(MANIFEST_FILE_NAME);
    if !manifest.is_file() {
        return false;
    }
    read_manifest(&manifest)
        .log_and_continue()
        .and_then(|value| value.get("name").and_then(Value::as_str).map(|n| n == package))
        .unwrap_or(false)
}

fn read_manifest(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| PuglintError::io_error(path, e))?;
    serde_json::from_str(&content).map_err(|e| PuglintError::config_parse(path, e.to_string()))
}

/// Whether the workspace root shows it wants the linter
///
/// Either a linter config file sits in the root, or the root `package.json`
/// carries a linter config field.
pub fn workspace_has_linter_config(root: &Path) -> bool {
    let has_config_file = fs::read_dir(root)
        .map(|entries| {
            entries.filter_map(|entry| entry.ok()).any(|entry| {
                CONFIG_FILE_PATTERN.is_match(&entry.file_name().to_string_lossy())
            })
        })
        .unwrap_or(false);
    if has_config_file {
        return true;
    }

    let manifest = root.join(MANIFEST_FILE_NAME);
    manifest.is_file()
        && read_manifest(&manifest)
            .log_and_continue()
            .is_some_and(|value| MANIFEST_FIELDS.iter().any(|field| value.get(*field).is_some()))
}
