//! Validation of open documents
//!
//! The linter instance is shared by every document and reconfigured before
//! each check, so configure-then-check runs under one lock guard. Results
//! are only published while the checked text is still the stored one.

use crate::client::ClientSink;
use crate::diagnostics::to_diagnostic;
use crate::documents::{Document, DocumentStore};
use puglint_core::{Linter, LinterOptions, PuglintError, Result};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tower_lsp::lsp_types::{Diagnostic, MessageType};

/// The linter shared by all validations
pub type SharedLinter = Mutex<Box<dyn Linter>>;

/// Validate one document and publish its diagnostics
///
/// Diagnostics for the document's uri are replaced, not merged. Returns
/// `Ok(None)` without publishing when the document changed or closed while
/// it was being checked. A linter failure is returned without publishing
/// anything.
pub async fn validate_one(
    document: &Document,
    options: &LinterOptions,
    linter: &SharedLinter,
    store: &DocumentStore,
    sink: &dyn ClientSink,
) -> Result<Option<Vec<Diagnostic>>> {
    let path = document
        .file_path()
        .unwrap_or_else(|| PathBuf::from(document.display_path()));

    let problems = {
        let mut linter = linter.lock().await;
        linter.configure(options.clone());
        linter.check(&document.text, &path).await
    };

    if !store.is_current(document).await {
        tracing::debug!(
            "{} moved on during validation; result dropped",
            document.display_path()
        );
        return Ok(None);
    }

    let diagnostics: Vec<Diagnostic> = problems?.iter().map(to_diagnostic).collect();
    tracing::debug!(
        "{} problem(s) in {}",
        diagnostics.len(),
        document.display_path()
    );
    sink.publish_diagnostics(document.uri.clone(), diagnostics.clone(), document.version)
        .await;

    Ok(Some(diagnostics))
}

/// Validate one document, showing a failure to the user right away
pub async fn validate_single(
    document: &Document,
    options: &LinterOptions,
    linter: &SharedLinter,
    store: &DocumentStore,
    sink: &dyn ClientSink,
) {
    if let Err(e) = validate_one(document, options, linter, store, sink).await {
        let message = failure_message(&e, document);
        tracing::warn!("{}", message);
        sink.show_message(MessageType::ERROR, message).await;
    }
}

/// Validate every document, reporting all failures together at the end
pub async fn validate_all(
    documents: &[(Document, LinterOptions)],
    linter: &SharedLinter,
    store: &DocumentStore,
    sink: &dyn ClientSink,
) -> ErrorTracker {
    let mut tracker = ErrorTracker::new();

    for (document, options) in documents {
        if let Err(e) = validate_one(document, options, linter, store, sink).await {
            tracker.add(failure_message(&e, document));
        }
    }

    tracker.send_errors(sink).await;
    tracker
}

/// User-facing text for a validation failure
pub fn failure_message(err: &PuglintError, document: &Document) -> String {
    match err {
        PuglintError::Unknown => format!(
            "An unknown error occurred while validating file: {}",
            document.display_path()
        ),
        other => other.to_string().replace("\r\n", " ").replace('\n', " "),
    }
}

/// Collects distinct failure messages during a batch
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorTracker {
    messages: Vec<String>,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message; duplicates are kept once
    pub fn add(&mut self, message: String) {
        if !self.messages.contains(&message) {
            self.messages.push(message);
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Show every collected message in a single notification
    pub async fn send_errors(&self, sink: &dyn ClientSink) {
        if self.messages.is_empty() {
            return;
        }
        sink.show_message(MessageType::ERROR, self.messages.join("\n"))
            .await;
    }
}
