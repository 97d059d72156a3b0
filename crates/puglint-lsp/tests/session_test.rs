//! Session behavior driven through the notification handlers
//!
//! A scripted linter stands in for pug-lint and a recording sink captures
//! everything the session would send to the editor.

use async_trait::async_trait;
use puglint_core::{
    ConfigLoader, ConfigResolver, Linter, LinterLoader, LinterOptions, ModuleLocator, ModulePath,
    Problem, ProblemMessage, PuglintError,
};
use puglint_lsp::{ClientSink, Session, SessionConfig, SessionState};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower_lsp::jsonrpc::ErrorCode;
use tower_lsp::lsp_types::*;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Publish(Url, Vec<Diagnostic>),
    Show(MessageType, String),
    Log(MessageType, String),
}

#[derive(Clone, Default)]
struct RecordingSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    fn published(&self) -> Vec<(Url, Vec<Diagnostic>)> {
        self.take()
            .into_iter()
            .filter_map(|event| match event {
                Event::Publish(uri, diagnostics) => Some((uri, diagnostics)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ClientSink for RecordingSink {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, _: Option<i32>) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Publish(uri, diagnostics));
    }

    async fn show_message(&self, typ: MessageType, message: String) {
        self.events.lock().unwrap().push(Event::Show(typ, message));
    }

    async fn log_message(&self, typ: MessageType, message: String) {
        self.events.lock().unwrap().push(Event::Log(typ, message));
    }
}

/// Reports every `#` as an id literal; `THROW` and `SILENT` make the check fail
struct ScriptedLinter {
    configured: Arc<Mutex<Vec<LinterOptions>>>,
}

#[async_trait]
impl Linter for ScriptedLinter {
    fn configure(&mut self, options: LinterOptions) {
        self.configured.lock().unwrap().push(options);
    }

    async fn check(&self, text: &str, path: &Path) -> puglint_core::Result<Vec<Problem>> {
        if text.contains("THROW") {
            return Err(PuglintError::linter_runtime(format!(
                "Cannot lint {}\nsee log",
                path.file_name().unwrap().to_string_lossy()
            )));
        }
        if text.contains("SILENT") {
            return Err(PuglintError::Unknown);
        }

        Ok(text
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                line.find('#').map(|column| Problem {
                    line: index as u32 + 1,
                    column: column as u32,
                    code: "PUG:LINT_DISALLOWIDLITERALS".to_string(),
                    msg: ProblemMessage::Text("Id literals must not be used".to_string()),
                })
            })
            .collect())
    }
}

#[derive(Clone, Default)]
struct ScriptedLoader {
    configured: Arc<Mutex<Vec<LinterOptions>>>,
}

impl ScriptedLoader {
    fn last_options(&self) -> LinterOptions {
        self.configured.lock().unwrap().last().cloned().unwrap()
    }
}

impl LinterLoader for ScriptedLoader {
    fn load(&self, _module: &ModulePath) -> puglint_core::Result<Box<dyn Linter>> {
        Ok(Box::new(ScriptedLinter {
            configured: self.configured.clone(),
        }))
    }
}

struct Harness {
    workspace: TempDir,
    loader: ScriptedLoader,
    session: Session<RecordingSink>,
}

impl Harness {
    fn new() -> Self {
        Self::with_home_dir(None)
    }

    fn with_home_dir(home_dir: Option<PathBuf>) -> Self {
        let workspace = TempDir::new().unwrap();
        let loader = ScriptedLoader::default();
        let config = SessionConfig {
            locator: ModuleLocator::new()
                .with_global_search(false)
                .with_node_path(None),
            loader: Arc::new(loader.clone()),
            resolver: ConfigResolver::new(ConfigLoader::new()).with_home_dir(home_dir),
        };
        Self {
            session: Session::new(RecordingSink::default(), config),
            workspace,
            loader,
        }
    }

    fn root(&self) -> &Path {
        self.workspace.path()
    }

    fn sink(&self) -> &RecordingSink {
        self.session.sink()
    }

    fn install_pug_lint(&self) {
        let module = self.root().join("node_modules/pug-lint");
        fs::create_dir_all(&module).unwrap();
        fs::write(module.join("package.json"), r#"{"name": "pug-lint"}"#).unwrap();
    }

    fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn uri(&self, relative: &str) -> Url {
        Url::from_file_path(self.root().join(relative)).unwrap()
    }

    #[allow(deprecated)]
    async fn initialize(&self) -> tower_lsp::jsonrpc::Result<InitializeResult> {
        let params = InitializeParams {
            root_uri: Some(Url::from_directory_path(self.root()).unwrap()),
            ..Default::default()
        };
        self.session.initialize(&params).await
    }

    async fn open(&self, relative: &str, text: &str) -> Url {
        let uri = self.uri(relative);
        self.session
            .did_open(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: uri.clone(),
                    language_id: "pug".to_string(),
                    version: 1,
                    text: text.to_string(),
                },
            })
            .await;
        uri
    }

    async fn change(&self, uri: &Url, version: i32, text: &str) {
        self.session
            .did_change(DidChangeTextDocumentParams {
                text_document: VersionedTextDocumentIdentifier {
                    uri: uri.clone(),
                    version,
                },
                content_changes: vec![TextDocumentContentChangeEvent {
                    range: None,
                    range_length: None,
                    text: text.to_string(),
                }],
            })
            .await;
    }

    async fn save(&self, uri: &Url) {
        self.session
            .did_save(DidSaveTextDocumentParams {
                text_document: TextDocumentIdentifier { uri: uri.clone() },
                text: None,
            })
            .await;
    }

    async fn configure(&self, settings: Value) {
        self.session
            .did_change_configuration(DidChangeConfigurationParams { settings })
            .await;
    }

    async fn watched_change(&self, relative: &str) {
        self.session
            .did_change_watched_files(DidChangeWatchedFilesParams {
                changes: vec![FileEvent {
                    uri: self.uri(relative),
                    typ: FileChangeType::CHANGED,
                }],
            })
            .await;
    }
}

#[tokio::test]
async fn test_ready_session_publishes_diagnostics_on_open() {
    let h = Harness::new();
    h.install_pug_lint();

    let result = h.initialize().await.unwrap();
    assert_eq!(h.session.state().await, SessionState::Ready);
    assert!(result.capabilities.text_document_sync.is_some());

    let uri = h.open("views/index.pug", "doctype html\ndiv#main\n").await;
    let published = h.sink().published();

    assert_eq!(published.len(), 1);
    let (published_uri, diagnostics) = &published[0];
    assert_eq!(published_uri, &uri);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].range.start, Position::new(1, 3));
    assert_eq!(diagnostics[0].range.end, Position::new(1, 3));
    assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
    assert_eq!(
        diagnostics[0].message,
        "Id literals must not be used [DISALLOWIDLITERALS]"
    );
}

#[tokio::test]
async fn test_missing_module_without_evidence_is_silent() {
    let h = Harness::new();

    let result = h.initialize().await;
    assert!(result.is_ok());
    assert_eq!(h.session.state().await, SessionState::AwaitingModule);

    h.open("index.pug", "div#main").await;
    h.configure(json!({"puglint": {"enable": true}})).await;
    assert!(h.sink().take().is_empty());
}

#[tokio::test]
async fn test_missing_module_with_config_file_fails_with_retry() {
    let h = Harness::new();
    h.write(".pug-lintrc", "{}");

    let err = h.initialize().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ServerError(99));
    assert!(err.message.contains("npm i pug-lint"));
    assert_eq!(err.data, Some(json!({"retry": true})));
    assert_eq!(h.session.state().await, SessionState::Unavailable);
}

#[tokio::test]
async fn test_missing_module_with_manifest_field_fails_with_retry() {
    let h = Harness::new();
    h.write("package.json", r#"{"name": "site", "pugLintConfig": {}}"#);

    let err = h.initialize().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ServerError(99));
}

#[tokio::test]
async fn test_close_clears_diagnostics() {
    let h = Harness::new();
    h.install_pug_lint();
    h.initialize().await.unwrap();
    let uri = h.open("index.pug", "div#main").await;
    h.sink().take();

    h.session
        .did_close(DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
        })
        .await;

    assert_eq!(h.sink().take(), vec![Event::Publish(uri, Vec::new())]);
    assert!(h.session.documents().all().await.is_empty());
}

#[tokio::test]
async fn test_on_type_validates_changes_but_not_saves() {
    let h = Harness::new();
    h.install_pug_lint();
    h.initialize().await.unwrap();
    let uri = h.open("index.pug", "p ok").await;
    h.sink().take();

    h.change(&uri, 2, "div#a\ndiv#b").await;
    let published = h.sink().published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].1.len(), 2);

    h.save(&uri).await;
    assert!(h.sink().take().is_empty());
}

#[tokio::test]
async fn test_on_save_mode_validates_only_on_save() {
    let h = Harness::new();
    h.install_pug_lint();
    h.initialize().await.unwrap();
    h.configure(json!({"puglint": {"run": "onSave"}})).await;
    h.sink().take();

    let uri = h.open("index.pug", "div#a").await;
    h.change(&uri, 2, "div#b").await;
    assert!(h.sink().take().is_empty());

    h.save(&uri).await;
    let published = h.sink().published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, uri);
}

#[tokio::test]
async fn test_revalidation_is_deterministic() {
    let h = Harness::new();
    h.install_pug_lint();
    h.initialize().await.unwrap();
    let uri = h.open("index.pug", "div#a\np\nspan#b").await;
    let first = h.sink().published();

    h.change(&uri, 2, "div#a\np\nspan#b").await;
    let second = h.sink().published();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_batch_failures_are_reported_once() {
    let h = Harness::new();
    h.install_pug_lint();
    h.initialize().await.unwrap();
    h.configure(json!({"puglint": {"run": "onSave"}})).await;
    h.open("a.pug", "THROW").await;
    h.open("b.pug", "div#ok").await;
    h.open("c.pug", "SILENT").await;
    h.sink().take();

    h.configure(json!({"puglint": {"run": "onType"}})).await;
    let events = h.sink().take();

    let publishes: Vec<&Event> = events
        .iter()
        .filter(|e| matches!(e, Event::Publish(..)))
        .collect();
    assert_eq!(publishes.len(), 1, "only the healthy document publishes");

    let errors: Vec<&String> = events
        .iter()
        .filter_map(|e| match e {
            Event::Show(MessageType::ERROR, message) => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1, "failures are batched into one message");
    assert!(errors[0].contains("Cannot lint a.pug see log"));
    assert!(errors[0].contains("An unknown error occurred while validating file:"));
    assert!(errors[0].contains("c.pug"));
}

#[tokio::test]
async fn test_single_failure_is_shown_immediately() {
    let h = Harness::new();
    h.install_pug_lint();
    h.initialize().await.unwrap();

    h.open("broken.pug", "THROW").await;
    assert_eq!(
        h.sink().take(),
        vec![Event::Show(
            MessageType::ERROR,
            "Cannot lint broken.pug see log".to_string()
        )]
    );
}

#[tokio::test]
async fn test_editor_config_wins_over_files() {
    let h = Harness::new();
    h.install_pug_lint();
    h.write(".pug-lintrc", r#"{"from": "file"}"#);
    h.initialize().await.unwrap();

    h.open("index.pug", "p").await;
    assert_eq!(h.loader.last_options().get("from"), Some(&json!("file")));

    h.configure(json!({"puglint": {"config": {"from": "editor", "extends": "clock"}}}))
        .await;
    let options = h.loader.last_options();
    assert_eq!(options.get("from"), Some(&json!("editor")));
    let preset = h
        .root()
        .join("node_modules/pug-lint-config-clock/index.js");
    assert_eq!(options.extends(), Some(preset.to_string_lossy().as_ref()));
}

#[tokio::test]
async fn test_watched_config_change_refreshes_cached_configuration() {
    let h = Harness::new();
    h.install_pug_lint();
    h.write(".pug-lintrc", r#"{"version": 1}"#);
    h.initialize().await.unwrap();
    let uri = h.open("index.pug", "p").await;
    assert_eq!(h.loader.last_options().get("version"), Some(&json!(1)));

    h.write(".pug-lintrc", r#"{"version": 2}"#);
    h.change(&uri, 2, "p again").await;
    assert_eq!(
        h.loader.last_options().get("version"),
        Some(&json!(1)),
        "configuration stays cached until the watcher fires"
    );

    h.watched_change(".pug-lintrc").await;
    assert_eq!(h.loader.last_options().get("version"), Some(&json!(2)));
}

#[tokio::test]
async fn test_unrelated_watched_files_are_ignored() {
    let h = Harness::new();
    h.install_pug_lint();
    h.initialize().await.unwrap();
    h.open("index.pug", "div#a").await;
    h.sink().take();

    h.watched_change("README.md").await;
    assert!(h.sink().take().is_empty());
}

#[tokio::test]
async fn test_installing_module_later_activates_session() {
    let h = Harness::new();
    h.initialize().await.unwrap();
    assert_eq!(h.session.state().await, SessionState::AwaitingModule);
    let uri = h.open("index.pug", "div#a").await;

    h.install_pug_lint();
    h.write("package.json", r#"{"devDependencies": {"pug-lint": "^2.6.0"}}"#);
    h.watched_change("package.json").await;

    assert_eq!(h.session.state().await, SessionState::Ready);
    let published = h.sink().published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, uri);
}

#[tokio::test]
async fn test_disabling_clears_diagnostics() {
    let h = Harness::new();
    h.install_pug_lint();
    h.initialize().await.unwrap();
    let uri = h.open("index.pug", "div#a").await;
    h.sink().take();

    h.configure(json!({"puglint": {"enable": false}})).await;
    assert_eq!(h.sink().take(), vec![Event::Publish(uri.clone(), Vec::new())]);

    h.change(&uri, 2, "div#b").await;
    assert!(h.sink().take().is_empty());
}

#[tokio::test]
async fn test_non_template_documents_are_skipped() {
    let h = Harness::new();
    h.install_pug_lint();
    h.initialize().await.unwrap();

    let uri = h.uri("index.html");
    h.session
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri,
                language_id: "html".to_string(),
                version: 1,
                text: "<div id=\"#\"></div>".to_string(),
            },
        })
        .await;
    assert!(h.sink().take().is_empty());
}

#[tokio::test]
async fn test_initialization_options_seed_settings() {
    let h = Harness::new();
    h.install_pug_lint();

    #[allow(deprecated)]
    let params = InitializeParams {
        root_uri: Some(Url::from_directory_path(h.root()).unwrap()),
        initialization_options: Some(json!({"puglint": {"run": "onSave"}})),
        ..Default::default()
    };
    h.session.initialize(&params).await.unwrap();

    assert_eq!(h.session.settings().await.run, puglint_core::RunMode::OnSave);
}

#[tokio::test]
async fn test_home_watcher_only_with_home_dir() {
    let h = Harness::new();
    let watchers = h.session.file_watchers();
    assert_eq!(watchers.len(), 3);
    assert!(
        watchers
            .iter()
            .all(|w| matches!(w.glob_pattern, GlobPattern::String(_)))
    );
}

#[tokio::test]
async fn test_home_watcher_follows_resolver_home_dir() {
    let home = TempDir::new().unwrap();
    let h = Harness::with_home_dir(Some(home.path().to_path_buf()));

    let watchers = h.session.file_watchers();
    assert_eq!(watchers.len(), 4);
    let GlobPattern::Relative(pattern) = &watchers[3].glob_pattern else {
        panic!("home watcher should be relative to the home directory");
    };
    assert_eq!(
        pattern.base_uri,
        OneOf::Right(Url::from_directory_path(home.path()).unwrap())
    );
    assert!(pattern.pattern.contains(".jade-lint.json"));
    assert!(!pattern.pattern.contains(".jade-lintrc.js"));
}

#[tokio::test]
async fn test_out_of_order_change_keeps_newest_diagnostics() {
    let h = Harness::new();
    h.install_pug_lint();
    h.initialize().await.unwrap();
    let uri = h.open("index.pug", "p ok").await;
    h.sink().take();

    h.change(&uri, 3, "div#a\ndiv#b").await;
    let published = h.sink().published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].1.len(), 2);

    // v2 arrives after v3
    h.change(&uri, 2, "p ok").await;
    assert!(h.sink().take().is_empty());

    let stored = h.session.documents().get(&uri).await.unwrap();
    assert_eq!(stored.version, Some(3));
    assert_eq!(stored.text, "div#a\ndiv#b");
}
