//! LSP server implementation for pug templates
//!
//! Thin `tower-lsp` adapter; the behavior lives in [`Session`].

use crate::session::{Session, SessionConfig};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

const WATCHER_REGISTRATION_ID: &str = "puglint-config-watcher";

/// puglint Language Server
pub struct PuglintLanguageServer {
    client: Client,
    session: Session<Client>,
}

impl PuglintLanguageServer {
    /// Create a new puglint language server
    pub fn new(client: Client, config: SessionConfig) -> Self {
        Self {
            session: Session::new(client.clone(), config),
            client,
        }
    }

    pub fn session(&self) -> &Session<Client> {
        &self.session
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for PuglintLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("Initializing puglint language server");
        self.session.initialize(&params).await
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(
                MessageType::INFO,
                format!("puglint language server v{} initialized", crate::VERSION),
            )
            .await;

        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: self.session.file_watchers(),
        };
        let registration = match serde_json::to_value(options) {
            Ok(value) => Registration {
                id: WATCHER_REGISTRATION_ID.to_string(),
                method: "workspace/didChangeWatchedFiles".to_string(),
                register_options: Some(value),
            },
            Err(e) => {
                tracing::warn!("Could not encode file watchers: {}", e);
                return;
            }
        };

        if self.client.register_capability(vec![registration]).await.is_err() {
            tracing::debug!("Client does not support file watching registration");
        }
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.session.did_open(params).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        self.session.did_change(params).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        self.session.did_save(params).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.session.did_close(params).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        self.session.did_change_configuration(params).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        self.session.did_change_watched_files(params).await;
    }
}
