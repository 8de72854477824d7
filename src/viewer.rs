use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::export;
use crate::html::HtmlBookmarkParser;
use crate::json::JsonBookmarkParser;
use crate::models::{Bookmark, BookmarkCollection, Config, ExportFormat, Stats};
use crate::search::{self, SearchDebouncer};
use crate::source::{read_upload, SourceFormat, TreeSource, Upload};
use crate::storage::{self, BookmarkStore};
use crate::tree;

/// Label used when restored state has no better name
pub const SAVED_SOURCE_LABEL: &str = "Saved Bookmarks";

/// Holds the canonical bookmark collection for a session.
///
/// Every load builds a complete new collection first and only then replaces the
/// current one, so a failed load leaves the previous bookmarks in place.
/// Loads are expected to be issued one at a time.
pub struct BookmarkViewer<S: BookmarkStore> {
    collection: Arc<BookmarkCollection>,
    source: Option<String>,
    store: S,
    config: Config,
}

impl<S: BookmarkStore> BookmarkViewer<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self {
            collection: Arc::new(BookmarkCollection::default()),
            source: None,
            store,
            config,
        }
    }

    /// Restores the collection persisted by a previous session, if any.
    ///
    /// Returns true when prior state was found.
    pub fn restore(&mut self) -> bool {
        match storage::load_snapshot(&self.store) {
            Some(snapshot) => {
                log::debug!(
                    "Restored {} bookmarks from '{}'",
                    snapshot.collection.len(),
                    snapshot.source
                );
                let source = if snapshot.source.trim().is_empty() {
                    SAVED_SOURCE_LABEL.to_string()
                } else {
                    snapshot.source
                };
                self.install(snapshot.collection, source, false);
                true
            }
            None => false,
        }
    }

    /// Loads the browser's native bookmark tree.
    pub async fn load_tree<T>(&mut self, source: &T) -> Result<Stats>
    where
        T: TreeSource + Sync + ?Sized,
    {
        let nodes = source.get_tree().await.map_err(|e| {
            log::error!("Failed to load browser bookmarks: {}", e);
            e
        })?;
        let collection = tree::extract(&nodes);
        self.install(collection, source.label(), self.config.persist_on_load);
        Ok(self.stats())
    }

    /// Reads a file from disk and imports it.
    pub async fn load_file(&mut self, path: &Path) -> Result<Stats> {
        let upload = read_upload(path).await.map_err(|e| {
            log::error!("File upload error: {}", e);
            e
        })?;
        self.import_upload(&upload)
    }

    /// Parses an uploaded HTML or JSON file and replaces the collection with it.
    pub fn import_upload(&mut self, upload: &Upload) -> Result<Stats> {
        let collection = self.parse_upload(upload).map_err(|e| {
            log::error!("Failed to import '{}': {}", upload.name, e);
            e
        })?;
        self.install(collection, upload.name.clone(), self.config.persist_on_load);
        Ok(self.stats())
    }

    fn parse_upload(&self, upload: &Upload) -> Result<BookmarkCollection> {
        match upload.format()? {
            SourceFormat::Html => {
                HtmlBookmarkParser::new(self.config.html_heading_search_depth).parse(&upload.content)
            }
            SourceFormat::Json => JsonBookmarkParser::new(self.config.max_json_depth).parse(&upload.content),
        }
    }

    /// Indexes a freshly built collection, swaps it in and optionally persists it.
    fn install(&mut self, mut collection: BookmarkCollection, source: String, persist: bool) {
        search::reindex(&mut collection.bookmarks);
        self.collection = Arc::new(collection);
        self.source = Some(source);

        if persist {
            if let Err(e) = self.persist() {
                log::warn!("Failed to save bookmarks: {}", e);
            }
        }
    }

    /// Writes the current collection to the store.
    pub fn persist(&self) -> Result<()> {
        let source = self.source.as_deref().unwrap_or(SAVED_SOURCE_LABEL);
        storage::save_snapshot(&self.store, &self.collection, source)
    }

    /// Empties the collection and erases the persisted copy.
    ///
    /// The in-memory state is cleared even when erasing fails; the error is
    /// returned so the caller can report it.
    pub fn clear(&mut self) -> Result<()> {
        self.collection = Arc::new(BookmarkCollection::default());
        self.source = None;
        storage::erase_snapshot(&self.store).map_err(|e| {
            log::warn!("Failed to clear persisted bookmarks: {}", e);
            e
        })
    }

    /// Filters the collection; a blank query returns everything.
    pub fn search(&self, query: &str) -> Vec<Bookmark> {
        search::filter(&self.collection.bookmarks, query)
    }

    /// Renders the collection for download.
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        export::export(&self.collection.bookmarks, format, self.config.pretty_export)
    }

    pub fn stats(&self) -> Stats {
        Stats {
            total: self.collection.len(),
            folder_count: self.collection.folders.len(),
            source: self.source.clone(),
        }
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.collection.bookmarks
    }

    pub fn collection(&self) -> &BookmarkCollection {
        &self.collection
    }

    /// Shared handle to the current collection, e.g. for a `SearchDebouncer`.
    pub fn snapshot(&self) -> Arc<BookmarkCollection> {
        Arc::clone(&self.collection)
    }

    /// Debouncer using the configured search delay.
    pub fn search_debouncer(&self) -> SearchDebouncer {
        SearchDebouncer::from_millis(self.config.search_debounce_ms)
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BookmarkError;
    use crate::models::TreeNode;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    struct StaticTree(Vec<TreeNode>);

    #[async_trait]
    impl TreeSource for StaticTree {
        fn label(&self) -> String {
            "Browser Bookmarks".to_string()
        }

        async fn get_tree(&self) -> Result<Vec<TreeNode>> {
            Ok(self.0.clone())
        }
    }

    struct UnavailableTree;

    #[async_trait]
    impl TreeSource for UnavailableTree {
        fn label(&self) -> String {
            "Browser Bookmarks".to_string()
        }

        async fn get_tree(&self) -> Result<Vec<TreeNode>> {
            Err(BookmarkError::SourceUnavailable("permission denied".to_string()))
        }
    }

    fn viewer() -> BookmarkViewer<MemoryStore> {
        BookmarkViewer::new(MemoryStore::new(), Config::default())
    }

    fn json_upload() -> Upload {
        Upload::new(
            "bookmarks.json",
            r#"[{"title":"A","url":"http://a.com","folder":"Work"},{"title":"B","url":"http://b.com"}]"#,
        )
    }

    #[tokio::test]
    async fn test_load_tree_indexes_and_persists() {
        let mut viewer = viewer();
        let source = StaticTree(vec![TreeNode::folder(
            "Work",
            vec![TreeNode::link("Site", "http://a.com")],
        )]);

        let stats = viewer.load_tree(&source).await.unwrap();

        assert_eq!(stats.total, 1);
        assert_eq!(stats.folder_count, 1);
        assert_eq!(stats.source.as_deref(), Some("Browser Bookmarks"));
        assert!(viewer.bookmarks()[0].search_key.is_some());
        assert!(storage::load_snapshot(viewer.store()).is_some());
    }

    #[tokio::test]
    async fn test_failed_tree_load_keeps_state() {
        let mut viewer = viewer();
        viewer.import_upload(&json_upload()).unwrap();

        let err = viewer.load_tree(&UnavailableTree).await.unwrap_err();

        assert!(matches!(err, BookmarkError::SourceUnavailable(_)));
        assert_eq!(viewer.stats().total, 2);
        assert_eq!(viewer.source(), Some("bookmarks.json"));
    }

    #[test]
    fn test_failed_import_keeps_state() {
        let mut viewer = viewer();
        viewer.import_upload(&json_upload()).unwrap();
        let before = viewer.collection().clone();

        let unsupported = viewer.import_upload(&Upload::new("notes.txt", "hello"));
        assert!(matches!(unsupported, Err(BookmarkError::UnsupportedFormat(_))));

        let broken = viewer.import_upload(&Upload::new("b.json", "not json{"));
        assert!(matches!(broken, Err(BookmarkError::Parse(_))));

        let empty = viewer.import_upload(&Upload::new("b.html", r##"<a href="#">x</a>"##));
        assert!(matches!(empty, Err(BookmarkError::Parse(_))));

        assert_eq!(viewer.collection(), &before);
        assert_eq!(viewer.source(), Some("bookmarks.json"));
    }

    #[test]
    fn test_persistence_failure_is_not_fatal() {
        let mut viewer = BookmarkViewer::new(MemoryStore::failing(), Config::default());

        let stats = viewer.import_upload(&json_upload()).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(viewer.search("work").len(), 1);

        assert!(viewer.clear().is_err());
        assert!(viewer.bookmarks().is_empty());
    }

    #[test]
    fn test_persist_on_load_disabled() {
        let config = Config {
            persist_on_load: false,
            ..Config::default()
        };
        let mut viewer = BookmarkViewer::new(MemoryStore::new(), config);
        viewer.import_upload(&json_upload()).unwrap();

        assert!(storage::load_snapshot(viewer.store()).is_none());
    }

    #[test]
    fn test_restore_and_clear() {
        let mut first = viewer();
        first.import_upload(&json_upload()).unwrap();
        let store = first.store;

        let mut second = BookmarkViewer::new(store, Config::default());
        assert!(second.restore());
        assert_eq!(second.stats().total, 2);
        assert_eq!(second.source(), Some("bookmarks.json"));
        assert_eq!(second.search("http://b").len(), 1);

        second.clear().unwrap();
        assert_eq!(second.stats(), Stats::default());
        assert!(!second.restore());
    }

    #[test]
    fn test_search_and_export() {
        let mut viewer = viewer();
        assert_eq!(viewer.export(ExportFormat::Json).unwrap(), "[]");

        viewer.import_upload(&json_upload()).unwrap();
        assert_eq!(viewer.search("").len(), 2);
        assert_eq!(viewer.search("WORK")[0].title, "A");

        let json = viewer.export(ExportFormat::Json).unwrap();
        assert!(json.contains("\"folder\": \"Work\""));
        let html = viewer.export(ExportFormat::Html).unwrap();
        assert!(html.contains("<H3>Work</H3>"));
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let mut viewer = viewer();
        viewer.import_upload(&json_upload()).unwrap();
        let snapshot = viewer.snapshot();

        viewer
            .import_upload(&Upload::new("other.json", r#"{"url":"http://c.com"}"#))
            .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(viewer.stats().total, 1);
    }

    #[tokio::test]
    async fn test_debounced_search_sees_snapshot() {
        let mut viewer = BookmarkViewer::new(
            MemoryStore::new(),
            Config {
                search_debounce_ms: 5,
                ..Config::default()
            },
        );
        viewer.import_upload(&json_upload()).unwrap();
        let debouncer = viewer.search_debouncer();
        let (tx, rx) = tokio::sync::oneshot::channel();

        debouncer
            .schedule(viewer.snapshot(), "work".to_string(), move |result| {
                let _ = tx.send(result);
            })
            .await;

        let result = rx.await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].url, "http://a.com");
    }
}
