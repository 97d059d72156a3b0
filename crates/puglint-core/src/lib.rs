//! puglint core
//!
//! Editor-independent pieces of the pug-lint integration: configuration
//! discovery, locating the linter installed in a project, and loading it
//! behind the [`Linter`] trait.

pub mod config;
pub mod error;
pub mod linter;
pub mod locator;
pub mod result;

pub use config::{
    ConfigLoader, ConfigResolver, ConfigSource, EditorSettings, LinterOptions, Resolution, RunMode,
};
pub use error::{ErrorKind, PuglintError};
pub use linter::{Linter, LinterLoader, NodeLinter, NodeLoader, NodeRuntime, Problem, ProblemMessage};
pub use locator::{
    ModuleLocator, ModuleOrigin, ModulePath, PUG_LINT_PACKAGE, workspace_has_linter_config,
};
pub use result::Result;

/// Initialize the tracing subscriber for logging
///
/// Output goes to stderr; stdout belongs to the protocol when serving LSP.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("puglint=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
