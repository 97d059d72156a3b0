//! Open document tracking

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tower_lsp::lsp_types::Url;

/// Language ids handled by the linter
pub const TEMPLATE_LANGUAGES: &[&str] = &["pug", "jade"];

/// File extensions handled by the linter
pub const TEMPLATE_EXTENSIONS: &[&str] = &["pug", "jade"];

/// An open text document as last reported by the editor
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub uri: Url,
    pub language_id: String,
    pub version: Option<i32>,
    pub text: String,
}

impl Document {
    pub fn new(uri: Url, language_id: impl Into<String>, version: Option<i32>, text: impl Into<String>) -> Self {
        Self {
            uri,
            language_id: language_id.into(),
            version,
            text: text.into(),
        }
    }

    /// File system path, when the document lives on disk
    pub fn file_path(&self) -> Option<PathBuf> {
        self.uri.to_file_path().ok()
    }

    /// Path handed to the linter and shown in error messages
    pub fn display_path(&self) -> String {
        self.file_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| self.uri.to_string())
    }

    /// Whether this is a pug/jade template
    pub fn is_template(&self) -> bool {
        if TEMPLATE_LANGUAGES.contains(&self.language_id.as_str()) {
            return true;
        }
        Path::new(self.uri.path())
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    }
}

/// Documents currently open in the editor
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<HashMap<Url, Document>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open(&self, document: Document) {
        self.documents
            .write()
            .await
            .insert(document.uri.clone(), document);
    }

    /// Replace the text of an open document
    ///
    /// Unknown documents are ignored, and so is a versioned change that is not
    /// newer than the stored version. Changes can be handled out of order, so
    /// an older full text must never replace a newer one. Text without a
    /// version (from a save) keeps the stored version.
    pub async fn update(&self, uri: &Url, version: Option<i32>, text: String) -> Option<Document> {
        let mut documents = self.documents.write().await;
        let document = documents.get_mut(uri)?;
        if let (Some(new), Some(current)) = (version, document.version)
            && new <= current
        {
            tracing::debug!("Ignoring stale change v{} for {} (have v{})", new, uri, current);
            return None;
        }
        if version.is_some() {
            document.version = version;
        }
        document.text = text;
        Some(document.clone())
    }

    /// Whether `document` is still what the store holds for its uri
    pub async fn is_current(&self, document: &Document) -> bool {
        self.documents
            .read()
            .await
            .get(&document.uri)
            .is_some_and(|stored| stored.version == document.version && stored.text == document.text)
    }

    pub async fn close(&self, uri: &Url) -> Option<Document> {
        self.documents.write().await.remove(uri)
    }

    pub async fn get(&self, uri: &Url) -> Option<Document> {
        self.documents.read().await.get(uri).cloned()
    }

    /// Snapshot of every open document, ordered by uri
    pub async fn all(&self) -> Vec<Document> {
        let mut documents: Vec<Document> = self.documents.read().await.values().cloned().collect();
        documents.sort_by(|a, b| a.uri.as_str().cmp(b.uri.as_str()));
        documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_template_detection() {
        let by_language = Document::new(uri("untitled:Untitled-1"), "pug", None, "");
        assert!(by_language.is_template());

        let by_extension = Document::new(uri("file:///w/views/index.jade"), "plaintext", None, "");
        assert!(by_extension.is_template());

        let other = Document::new(uri("file:///w/index.html"), "html", None, "");
        assert!(!other.is_template());
    }

    #[test]
    fn test_display_path_falls_back_to_uri() {
        let doc = Document::new(uri("untitled:Untitled-1"), "pug", None, "");
        assert_eq!(doc.display_path(), "untitled:Untitled-1");
    }

    #[tokio::test]
    async fn test_store_lifecycle() {
        let store = DocumentStore::new();
        let u = uri("file:///w/a.pug");
        store.open(Document::new(u.clone(), "pug", Some(1), "p hi")).await;

        let updated = store.update(&u, Some(2), "p bye".to_string()).await.unwrap();
        assert_eq!(updated.text, "p bye");
        assert_eq!(updated.version, Some(2));

        assert!(store.is_current(&updated).await);
        assert!(store.close(&u).await.is_some());
        assert!(!store.is_current(&updated).await);
        assert!(store.get(&u).await.is_none());
        assert!(store.update(&u, Some(3), String::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_out_of_order_change_is_ignored() {
        let store = DocumentStore::new();
        let u = uri("file:///w/a.pug");
        store.open(Document::new(u.clone(), "pug", Some(1), "v1")).await;

        let newest = store.update(&u, Some(3), "v3".to_string()).await.unwrap();
        assert!(store.update(&u, Some(2), "v2".to_string()).await.is_none());
        assert!(store.update(&u, Some(3), "v3 again".to_string()).await.is_none());

        let stored = store.get(&u).await.unwrap();
        assert_eq!(stored.version, Some(3));
        assert_eq!(stored.text, "v3");
        assert!(store.is_current(&newest).await);
    }

    #[tokio::test]
    async fn test_unversioned_text_keeps_version() {
        let store = DocumentStore::new();
        let u = uri("file:///w/a.pug");
        store.open(Document::new(u.clone(), "pug", Some(4), "p")).await;

        let saved = store.update(&u, None, "p saved".to_string()).await.unwrap();
        assert_eq!(saved.version, Some(4));
        assert_eq!(saved.text, "p saved");
    }

    #[tokio::test]
    async fn test_all_is_ordered() {
        let store = DocumentStore::new();
        store.open(Document::new(uri("file:///w/b.pug"), "pug", None, "")).await;
        store.open(Document::new(uri("file:///w/a.pug"), "pug", None, "")).await;

        let uris: Vec<String> = store.all().await.iter().map(|d| d.uri.to_string()).collect();
        assert_eq!(uris, vec!["file:///w/a.pug", "file:///w/b.pug"]);
    }
}
