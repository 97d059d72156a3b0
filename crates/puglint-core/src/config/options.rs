//! Linter options and editor settings

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Prefix of installable preset packages referenced by a bare `extends` name
pub const PRESET_PREFIX: &str = "pug-lint-config-";

/// Effective linter configuration handed to `Linter::configure`
///
/// Opaque to us apart from `extends`, which may need expanding into a
/// concrete preset path before the linter sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinterOptions(Map<String, Value>);

impl LinterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, accepting only objects
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// The `extends` reference, when it is a string
    pub fn extends(&self) -> Option<&str> {
        self.0.get("extends").and_then(Value::as_str)
    }

    /// Rewrite a bare `extends` name into the conventional preset location
    /// under `workspace_root/node_modules`
    ///
    /// `extends: "clock"` becomes
    /// `<workspace_root>/node_modules/pug-lint-config-clock/index.js`.
    /// Values containing a path separator are already paths and stay as they are.
    pub fn expand_extends(&mut self, workspace_root: &Path) {
        let Some(name) = self.extends() else {
            return;
        };
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return;
        }

        let preset = workspace_root
            .join("node_modules")
            .join(format!("{PRESET_PREFIX}{name}"))
            .join("index.js");
        tracing::debug!("Expanded preset '{}' to {}", name, preset.display());
        self.0.insert(
            "extends".to_string(),
            Value::String(preset.to_string_lossy().into_owned()),
        );
    }
}

/// When the editor asks for validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Validate on every content change
    #[default]
    #[serde(rename = "onType")]
    OnType,
    /// Validate when the document is saved
    #[serde(rename = "onSave")]
    OnSave,
}

/// Settings pushed by the editor under the `puglint` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    /// Master switch; when false no diagnostics are produced
    pub enable: bool,

    /// Validation trigger
    pub run: RunMode,

    /// Inline linter configuration; wins over every file when non-empty
    pub config: LinterOptions,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            enable: true,
            run: RunMode::OnType,
            config: LinterOptions::new(),
        }
    }
}

impl EditorSettings {
    /// Extract settings from a `workspace/didChangeConfiguration` payload
    ///
    /// Clients either nest our settings under `puglint` or send the section
    /// itself. Anything unparseable falls back to defaults.
    pub fn from_settings_value(value: &Value) -> Self {
        let section = value.get("puglint").unwrap_or(value);
        match serde_json::from_value(section.clone()) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring malformed puglint settings: {}", e);
                Self::default()
            }
        }
    }

    /// Inline options, if the editor supplied any
    pub fn inline_options(&self) -> Option<&LinterOptions> {
        (!self.config.is_empty()).then_some(&self.config)
    }
}
