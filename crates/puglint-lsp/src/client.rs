//! Outbound notifications
//!
//! The session only needs to publish diagnostics and show or log messages.
//! [`ClientSink`] captures that so the session can be driven without a live
//! connection.

use async_trait::async_trait;
use tower_lsp::Client;
use tower_lsp::lsp_types::{Diagnostic, MessageType, Url};

#[async_trait]
pub trait ClientSink: Send + Sync {
    /// `textDocument/publishDiagnostics`, replacing earlier diagnostics for `uri`
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>);

    /// `window/showMessage`
    async fn show_message(&self, typ: MessageType, message: String);

    /// `window/logMessage`
    async fn log_message(&self, typ: MessageType, message: String);
}

#[async_trait]
impl ClientSink for Client {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        Client::publish_diagnostics(self, uri, diagnostics, version).await;
    }

    async fn show_message(&self, typ: MessageType, message: String) {
        Client::show_message(self, typ, message).await;
    }

    async fn log_message(&self, typ: MessageType, message: String) {
        Client::log_message(self, typ, message).await;
    }
}
