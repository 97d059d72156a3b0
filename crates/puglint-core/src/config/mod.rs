//! Configuration system for pug-lint integrations
//!
//! Configuration reaches the linter from one of several places, chosen in
//! priority order by [`ConfigResolver`]:
//!
//! - inline `puglint.config` settings supplied by the editor
//! - `.pug-lintrc`, `.pug-lintrc.js`, `.pug-lintrc.json`, `.pug-lint.json`,
//!   `.jade-lintrc` or `.jade-lint.json` between the document and the workspace root
//! - the `pugLintConfig` field of the nearest `package.json`
//! - the same rc files in the home directory
//!
//! ## Example Configuration
//!
//! ```jsonc
//! {
//!   // bare names refer to installed `pug-lint-config-*` presets
//!   "extends": "clock",
//!   "disallowClassLiterals": true,
//!   "validateIndentation": 2
//! }
//! ```

mod loader;
mod options;
mod resolver;

pub use loader::{CONFIG_FILE_NAMES, ConfigLoader, MANIFEST_FIELDS, MANIFEST_FILE_NAME};
pub use options::{EditorSettings, LinterOptions, PRESET_PREFIX, RunMode};
pub use resolver::{ConfigResolver, ConfigSource, Resolution};
