//! Config file loading
//!
//! Reads one named config file from a directory and turns it into
//! [`LinterOptions`]. JSON-style files are parsed with `json5`, the same
//! leniency pug-lint applies (comments, trailing commas). `.js` files are
//! evaluated with node since only a JavaScript runtime can execute them.

use super::options::LinterOptions;
use crate::error::PuglintError;
use crate::linter::NodeRuntime;
use crate::result::Result;
use serde_json::Value;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

/// Config file names, in the order they are tried within one directory
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".pug-lintrc",
    ".pug-lintrc.js",
    ".pug-lintrc.json",
    ".pug-lint.json",
    ".jade-lintrc",
    ".jade-lint.json",
];

/// Package manifest file name
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Manifest fields that may carry the linter configuration, in priority order
pub const MANIFEST_FIELDS: &[&str] = &["pugLintConfig", "jadeLintConfig"];

const EVAL_CONFIG_SCRIPT: &str = r#"
const config = require(process.argv[1]);
process.stdout.write(JSON.stringify(config === undefined ? null : config));
"#;

/// Loads individual config files
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    node: Option<NodeRuntime>,
}

impl ConfigLoader {
    /// Loader that can only read JSON-style files
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that evaluates `.js` config files with the given node runtime
    pub fn with_node(node: NodeRuntime) -> Self {
        Self { node: Some(node) }
    }

    /// Load `filename` from `directory`
    ///
    /// Fails with [`PuglintError::ConfigNotFound`] when the file is absent
    /// and [`PuglintError::ConfigParse`] when it does not hold a JSON object.
    pub async fn load_config_file(&self, directory: &Path, filename: &str) -> Result<LinterOptions> {
        let path = directory.join(filename);

        if filename.ends_with(".js") {
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(PuglintError::ConfigNotFound { path });
            }
            let Some(node) = &self.node else {
                return Err(PuglintError::config_parse(
                    &path,
                    "node is required to evaluate JavaScript config files",
                ));
            };
            let output = node
                .run_script(EVAL_CONFIG_SCRIPT, &[path.as_os_str()], None, directory)
                .await
                .map_err(|e| PuglintError::config_parse(&path, e.to_string()))?;
            let value: Value = serde_json::from_str(&output)
                .map_err(|e| PuglintError::config_parse(&path, e.to_string()))?;
            return object_options(&path, value);
        }

        let content = read_file(&path).await?;
        let value: Value =
            json5::from_str(&content).map_err(|e| PuglintError::config_parse(&path, e.to_string()))?;
        tracing::debug!("Loaded config file {}", path.display());
        object_options(&path, value)
    }

    /// Read the linter configuration field from `directory/package.json`
    ///
    /// `Ok(None)` means the manifest exists but has no recognized field.
    pub async fn load_manifest_field(&self, directory: &Path) -> Result<Option<LinterOptions>> {
        let path = directory.join(MANIFEST_FILE_NAME);
        let content = read_file(&path).await?;
        let manifest: Value = serde_json::from_str(&content)
            .map_err(|e| PuglintError::config_parse(&path, e.to_string()))?;

        for field in MANIFEST_FIELDS {
            if let Some(value) = manifest.get(*field) {
                tracing::debug!("Found '{}' in {}", field, path.display());
                return object_options(&path, value.clone()).map(Some);
            }
        }

        Ok(None)
    }
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == IoErrorKind::NotFound {
            PuglintError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PuglintError::io_error(path, e)
        }
    })
}

fn object_options(path: &Path, value: Value) -> Result<LinterOptions> {
    LinterOptions::from_value(value)
        .ok_or_else(|| PuglintError::config_parse(path, "configuration must be a JSON object"))
}
