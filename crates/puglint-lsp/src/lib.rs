//! puglint Language Server Protocol (LSP)
//!
//! Publishes pug-lint problems for pug/jade templates as diagnostics:
//! - Validation on edit or on save, per the `puglint.run` setting
//! - Configuration discovery from editor settings, rc files, `package.json` and the home directory
//! - Re-validation when settings or watched config files change
//! - A retryable initialization error when the workspace uses pug-lint but it is not installed

pub mod client;
pub mod diagnostics;
pub mod documents;
pub mod server;
pub mod session;
pub mod validation;

pub use client::ClientSink;
pub use server::PuglintLanguageServer;
pub use session::{Session, SessionConfig, SessionState};

use tower_lsp::{LspService, Server};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Serve LSP over stdin/stdout until the client disconnects
pub async fn serve_stdio(config: SessionConfig) {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) =
        LspService::new(move |client| PuglintLanguageServer::new(client, config));
    Server::new(stdin, stdout, socket).serve(service).await;
}
