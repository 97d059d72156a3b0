//! Effective configuration resolution
//!
//! Sources are tried in a fixed order and the first one that yields options
//! wins:
//!
//! 1. non-empty inline options from the editor
//! 2. a config file found walking from the document directory up to the workspace root
//! 3. the nearest `package.json` carrying `pugLintConfig`
//! 4. a config file in the home directory
//! 5. empty options
//!
//! Resolution never fails. A source that exists but cannot be read is
//! recorded as a warning and the chain moves on to the next source.

use super::loader::{CONFIG_FILE_NAMES, ConfigLoader};
use super::options::LinterOptions;
use crate::error::{ErrorKind, PuglintError};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "camelCase")]
pub enum ConfigSource {
    Editor,
    ProjectFile(PathBuf),
    PackageManifest(PathBuf),
    HomeFile(PathBuf),
    Default,
}

/// Outcome of a resolution
#[derive(Debug)]
pub struct Resolution {
    pub options: LinterOptions,
    pub source: ConfigSource,
    /// Sources that were present but unusable
    pub warnings: Vec<PuglintError>,
}

/// Applies the configuration priority chain
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    loader: ConfigLoader,
    home_dir: Option<PathBuf>,
}

impl ConfigResolver {
    /// Resolver using the user's home directory for global config
    pub fn new(loader: ConfigLoader) -> Self {
        Self {
            loader,
            home_dir: dirs::home_dir(),
        }
    }

    /// Override (or disable) the home directory lookup
    pub fn with_home_dir(mut self, home_dir: Option<PathBuf>) -> Self {
        self.home_dir = home_dir;
        self
    }

    /// Home directory consulted for global config files
    pub fn home_dir(&self) -> Option<&Path> {
        self.home_dir.as_deref()
    }

    /// Resolve the effective configuration for a document in `document_dir`
    ///
    /// A bare `extends` name in the result is expanded against `workspace_dir`.
    pub async fn resolve(
        &self,
        workspace_dir: &Path,
        document_dir: &Path,
        editor_options: Option<&LinterOptions>,
    ) -> Resolution {
        let mut warnings = Vec::new();

        let (mut options, source) = match editor_options.filter(|o| !o.is_empty()) {
            Some(options) => (options.clone(), ConfigSource::Editor),
            None => self.resolve_from_files(workspace_dir, document_dir, &mut warnings).await,
        };

        options.expand_extends(workspace_dir);
        tracing::debug!(
            "Resolved configuration for {} from {:?}",
            document_dir.display(),
            source
        );

        Resolution {
            options,
            source,
            warnings,
        }
    }

    async fn resolve_from_files(
        &self,
        workspace_dir: &Path,
        document_dir: &Path,
        warnings: &mut Vec<PuglintError>,
    ) -> (LinterOptions, ConfigSource) {
        let search_dirs = search_dirs(workspace_dir, document_dir);

        for dir in &search_dirs {
            if let Some((options, path)) = self.first_config_file(dir, warnings).await {
                return (options, ConfigSource::ProjectFile(path));
            }
        }

        for dir in &search_dirs {
            match self.loader.load_manifest_field(dir).await {
                Ok(Some(options)) => {
                    return (options, ConfigSource::PackageManifest(dir.join("package.json")));
                }
                Ok(None) => {}
                Err(e) => record(e, warnings),
            }
        }

        if let Some(home) = &self.home_dir
            && let Some((options, path)) = self.first_config_file(home, warnings).await
        {
            return (options, ConfigSource::HomeFile(path));
        }

        (LinterOptions::new(), ConfigSource::Default)
    }

    async fn first_config_file(
        &self,
        dir: &Path,
        warnings: &mut Vec<PuglintError>,
    ) -> Option<(LinterOptions, PathBuf)> {
        for filename in CONFIG_FILE_NAMES {
            match self.loader.load_config_file(dir, filename).await {
                Ok(options) => return Some((options, dir.join(filename))),
                Err(e) => record(e, warnings),
            }
        }
        None
    }
}

fn record(err: PuglintError, warnings: &mut Vec<PuglintError>) {
    if err.kind() == ErrorKind::ConfigNotFound {
        return;
    }
    tracing::warn!("Skipping config source: {}", err);
    warnings.push(err);
}

/// Directories from `document_dir` up to `workspace_dir` inclusive
///
/// A document outside the workspace gets every one of its ancestors.
fn search_dirs(workspace_dir: &Path, document_dir: &Path) -> Vec<PathBuf> {
    let inside = document_dir.starts_with(workspace_dir);
    let mut dirs = Vec::new();

    for dir in document_dir.ancestors() {
        dirs.push(dir.to_path_buf());
        if inside && dir == workspace_dir {
            break;
        }
    }

    dirs
}
