//! Session controller
//!
//! Owns everything a running server knows: the workspace root, the editor
//! settings snapshot, the open documents, the resolved configuration cache
//! and, once the linter has been located, the linter itself.
//!
//! ```text
//! Uninitialized --initialize--> Ready
//!               \-------------> AwaitingModule --package.json changed--> Ready
//!                \------------> Unavailable
//! ```
//!
//! `AwaitingModule` is the quiet state for workspaces that never asked for
//! the linter; `Unavailable` is reached when the workspace is configured for
//! pug-lint but the package is missing, and initialization fails with a
//! retryable error.

use crate::client::ClientSink;
use crate::documents::{Document, DocumentStore};
use crate::validation::{SharedLinter, validate_all, validate_single};
use puglint_core::config::{CONFIG_FILE_NAMES, MANIFEST_FILE_NAME};
use puglint_core::{
    ConfigResolver, EditorSettings, LinterLoader, LinterOptions, ModuleLocator, PUG_LINT_PACKAGE,
    RunMode, workspace_has_linter_config,
};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_lsp::jsonrpc::{Error, ErrorCode, Result as JsonRpcResult};
use tower_lsp::lsp_types::{
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidChangeWatchedFilesParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    FileSystemWatcher, GlobPattern, InitializeParams, InitializeResult, MessageType, OneOf,
    RelativePattern, SaveOptions, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind, TextDocumentSyncOptions, TextDocumentSyncSaveOptions, Url, WatchKind,
};

/// JSON-RPC error code sent when the workspace wants pug-lint but it is not installed
pub const MODULE_NOT_FOUND_CODE: i64 = 99;

/// Message shown when the workspace wants pug-lint but it is not installed
pub const PUG_LINT_NOT_FOUND: &str = "Failed to load pug-lint library. \
Please install pug-lint in your workspace folder using **npm i pug-lint** \
or globally using **npm i -g pug-lint** and then press Retry.";

/// Workspace-scoped config file globs
pub const WORKSPACE_WATCH_GLOBS: &[&str] = &[
    "**/.pug-lint{rc,rc.js,rc.json,.json}",
    "**/.jade-lint{rc,.json}",
    "**/package.json",
];

/// Home-directory config file glob, matching exactly the names the resolver reads
pub fn home_watch_glob() -> String {
    format!("{{{}}}", CONFIG_FILE_NAMES.join(","))
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    AwaitingModule,
    Ready,
    Unavailable,
}

/// Collaborators a session is built from
pub struct SessionConfig {
    pub locator: ModuleLocator,
    pub loader: Arc<dyn LinterLoader>,
    /// Also decides which home directory is watched
    pub resolver: ConfigResolver,
}

pub struct Session<S: ClientSink> {
    sink: S,
    locator: ModuleLocator,
    loader: Arc<dyn LinterLoader>,
    resolver: ConfigResolver,
    state: RwLock<SessionState>,
    linter: RwLock<Option<Arc<SharedLinter>>>,
    workspace_root: RwLock<Option<PathBuf>>,
    settings: RwLock<EditorSettings>,
    /// File-resolved options per document directory; cleared when a watched config file changes
    config_cache: RwLock<HashMap<PathBuf, LinterOptions>>,
    documents: DocumentStore,
}

impl<S: ClientSink> Session<S> {
    pub fn new(sink: S, config: SessionConfig) -> Self {
        Self {
            sink,
            locator: config.locator,
            loader: config.loader,
            resolver: config.resolver,
            state: RwLock::new(SessionState::Uninitialized),
            linter: RwLock::new(None),
            workspace_root: RwLock::new(None),
            settings: RwLock::new(EditorSettings::default()),
            config_cache: RwLock::new(HashMap::new()),
            documents: DocumentStore::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn settings(&self) -> EditorSettings {
        self.settings.read().await.clone()
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Handle `initialize`
    pub async fn initialize(&self, params: &InitializeParams) -> JsonRpcResult<InitializeResult> {
        let root = workspace_root(params);
        tracing::info!("Workspace root: {}", root.display());
        *self.workspace_root.write().await = Some(root.clone());

        if let Some(options) = &params.initialization_options {
            *self.settings.write().await = EditorSettings::from_settings_value(options);
        }

        match self.activate(&root).await {
            Ok(true) => {}
            Ok(false) if workspace_has_linter_config(&root) => {
                tracing::error!("pug-lint is configured in {} but not installed", root.display());
                *self.state.write().await = SessionState::Unavailable;
                return Err(module_not_found_error());
            }
            Ok(false) => {
                tracing::info!("pug-lint not installed and not configured; staying inactive");
                *self.state.write().await = SessionState::AwaitingModule;
            }
            Err(e) => {
                tracing::error!("Failed to load pug-lint: {}", e);
                self.sink
                    .log_message(MessageType::ERROR, format!("Failed to load pug-lint: {e}"))
                    .await;
                *self.state.write().await = SessionState::AwaitingModule;
            }
        }

        Ok(initialize_result())
    }

    /// Locate and load the linter; `Ok(false)` when it is not installed
    async fn activate(&self, root: &Path) -> puglint_core::Result<bool> {
        let Some(module) = self.locator.locate(PUG_LINT_PACKAGE, root) else {
            return Ok(false);
        };

        let linter = self.loader.load(&module)?;
        *self.linter.write().await = Some(Arc::new(Mutex::new(linter)));
        *self.state.write().await = SessionState::Ready;
        tracing::info!("pug-lint ready ({})", module.root().display());
        Ok(true)
    }

    /// File watchers to register once the client is initialized
    pub fn file_watchers(&self) -> Vec<FileSystemWatcher> {
        let mut watchers: Vec<FileSystemWatcher> = WORKSPACE_WATCH_GLOBS
            .iter()
            .map(|glob| FileSystemWatcher {
                glob_pattern: GlobPattern::String((*glob).to_string()),
                kind: Some(WatchKind::all()),
            })
            .collect();

        if let Some(home) = self.resolver.home_dir()
            && let Ok(base) = Url::from_directory_path(home)
        {
            watchers.push(FileSystemWatcher {
                glob_pattern: GlobPattern::Relative(RelativePattern {
                    base_uri: OneOf::Right(base),
                    pattern: home_watch_glob(),
                }),
                kind: Some(WatchKind::all()),
            });
        }

        watchers
    }

    pub async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let item = params.text_document;
        let document = Document::new(item.uri, item.language_id, Some(item.version), item.text);
        self.documents.open(document.clone()).await;

        if self.settings.read().await.run == RunMode::OnType {
            self.validate_document(&document).await;
        }
    }

    pub async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // full sync: the last change carries the whole text
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        let identifier = params.text_document;
        let Some(document) = self
            .documents
            .update(&identifier.uri, Some(identifier.version), change.text)
            .await
        else {
            tracing::debug!("No newer document for {}; change dropped", identifier.uri);
            return;
        };

        if self.settings.read().await.run == RunMode::OnType {
            self.validate_document(&document).await;
        }
    }

    pub async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        let document = match params.text {
            Some(text) => self.documents.update(&uri, None, text).await,
            None => self.documents.get(&uri).await,
        };
        let Some(document) = document else {
            return;
        };

        if self.settings.read().await.run == RunMode::OnSave {
            self.validate_document(&document).await;
        }
    }

    pub async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.close(&uri).await;
        self.sink.publish_diagnostics(uri, Vec::new(), None).await;
    }

    pub async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let settings = EditorSettings::from_settings_value(&params.settings);
        tracing::debug!("Settings changed: {:?}", settings);
        let enabled = settings.enable;
        *self.settings.write().await = settings;

        if self.state().await != SessionState::Ready {
            return;
        }

        if enabled {
            self.validate_open_documents().await;
        } else {
            self.clear_all_diagnostics().await;
        }
    }

    pub async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let changed: Vec<String> = params
            .changes
            .iter()
            .filter_map(|change| change.uri.path_segments()?.next_back().map(str::to_string))
            .filter(|name| is_config_file_name(name))
            .collect();
        if changed.is_empty() {
            return;
        }

        self.config_cache.write().await.clear();
        tracing::debug!("Config files changed ({:?}); cached configuration dropped", changed);

        match self.state().await {
            SessionState::Ready => self.validate_open_documents().await,
            SessionState::AwaitingModule => {
                if changed.iter().any(|name| name == MANIFEST_FILE_NAME) {
                    self.retry_activation().await;
                }
            }
            SessionState::Uninitialized | SessionState::Unavailable => {}
        }
    }

    /// Try again to find the linter after dependencies changed
    async fn retry_activation(&self) {
        let Some(root) = self.workspace_root.read().await.clone() else {
            return;
        };

        match self.activate(&root).await {
            Ok(true) => {
                self.sink
                    .log_message(MessageType::INFO, "pug-lint found; validating open documents".to_string())
                    .await;
                self.validate_open_documents().await;
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("pug-lint found but failed to load: {}", e),
        }
    }

    async fn ready_linter(&self) -> Option<Arc<SharedLinter>> {
        self.linter.read().await.clone()
    }

    async fn validate_document(&self, document: &Document) {
        let Some(linter) = self.ready_linter().await else {
            return;
        };
        if !self.settings.read().await.enable || !document.is_template() {
            return;
        }

        let options = self.options_for(document).await;
        validate_single(document, &options, &linter, &self.documents, &self.sink).await;
    }

    async fn validate_open_documents(&self) {
        let Some(linter) = self.ready_linter().await else {
            return;
        };
        if !self.settings.read().await.enable {
            return;
        }

        let mut batch = Vec::new();
        for document in self.documents.all().await {
            if document.is_template() {
                let options = self.options_for(&document).await;
                batch.push((document, options));
            }
        }

        let tracker = validate_all(&batch, &linter, &self.documents, &self.sink).await;
        tracing::debug!(
            "Validated {} document(s), {} failure(s)",
            batch.len(),
            tracker.messages().len()
        );
    }

    async fn clear_all_diagnostics(&self) {
        for document in self.documents.all().await {
            self.sink
                .publish_diagnostics(document.uri, Vec::new(), document.version)
                .await;
        }
    }

    /// Effective options for a document
    ///
    /// Inline editor options are used as-is; file-based resolutions are
    /// cached per directory until a watched config file changes.
    async fn options_for(&self, document: &Document) -> LinterOptions {
        let settings = self.settings.read().await.clone();
        let root = self
            .workspace_root
            .read()
            .await
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let document_dir = document
            .file_path()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| root.clone());

        let inline = settings.inline_options();
        if inline.is_none()
            && let Some(options) = self.config_cache.read().await.get(&document_dir)
        {
            return options.clone();
        }

        let resolution = self.resolver.resolve(&root, &document_dir, inline).await;
        for warning in &resolution.warnings {
            self.sink
                .show_message(
                    MessageType::WARNING,
                    format!("puglint: {warning}. Falling back to the next configuration source."),
                )
                .await;
        }

        if inline.is_none() {
            self.config_cache
                .write()
                .await
                .insert(document_dir, resolution.options.clone());
        }
        resolution.options
    }
}

/// Config file names a watched-file event may refer to
pub fn is_config_file_name(name: &str) -> bool {
    name == MANIFEST_FILE_NAME || CONFIG_FILE_NAMES.contains(&name)
}

fn module_not_found_error() -> Error {
    Error {
        code: ErrorCode::ServerError(MODULE_NOT_FOUND_CODE),
        message: PUG_LINT_NOT_FOUND.into(),
        data: Some(json!({ "retry": true })),
    }
}

fn initialize_result() -> InitializeResult {
    InitializeResult {
        server_info: Some(ServerInfo {
            name: "puglint-lsp".to_string(),
            version: Some(crate::VERSION.to_string()),
        }),
        capabilities: ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    will_save: Some(false),
                    will_save_wait_until: Some(false),
                    save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                        include_text: Some(false),
                    })),
                },
            )),
            ..Default::default()
        },
    }
}

/// Workspace root from `rootUri`, `rootPath`, the first workspace folder, or the process cwd
#[allow(deprecated)]
fn workspace_root(params: &InitializeParams) -> PathBuf {
    params
        .root_uri
        .as_ref()
        .and_then(|uri| uri.to_file_path().ok())
        .or_else(|| params.root_path.as_ref().map(PathBuf::from))
        .or_else(|| {
            params
                .workspace_folders
                .as_ref()
                .and_then(|folders| folders.first())
                .and_then(|folder| folder.uri.to_file_path().ok())
        })
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
