use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::models::{Bookmark, BookmarkCollection};

/// Recomputes the search key of every bookmark.
///
/// The key is the lowercase `title url folder`. Safe to call repeatedly and on
/// an empty list.
pub fn reindex(bookmarks: &mut [Bookmark]) {
    for bookmark in bookmarks.iter_mut() {
        bookmark.search_key = Some(
            format!("{} {} {}", bookmark.title, bookmark.url, bookmark.folder).to_lowercase(),
        );
    }
}

/// Returns the bookmarks whose search key contains `query`, case-insensitively.
///
/// A blank query returns the whole list. Bookmarks that were never indexed do
/// not match a non-blank query. Canonical order is preserved.
pub fn filter(bookmarks: &[Bookmark], query: &str) -> Vec<Bookmark> {
    if query.trim().is_empty() {
        return bookmarks.to_vec();
    }
    let needle = query.to_lowercase();
    bookmarks
        .iter()
        .filter(|b| b.search_key.as_deref().is_some_and(|key| key.contains(&needle)))
        .cloned()
        .collect()
}

/// Runs a filter after a quiet period, dropping the one scheduled before it.
///
/// Meant for search-as-you-type: only the last query of a burst is evaluated.
pub struct SearchDebouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Schedules `filter(collection, query)` and hands the result to `on_result`.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn schedule<F>(&self, collection: Arc<BookmarkCollection>, query: String, on_result: F)
    where
        F: FnOnce(Vec<Bookmark>) + Send + 'static,
    {
        let mut pending = self.pending.lock().await;
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let delay = self.delay;
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            on_result(filter(&collection.bookmarks, &query));
        });
        *pending = Some(handle);
    }

    /// Drops the scheduled filter, if any.
    pub async fn cancel(&self) {
        if let Some(handle) = self.pending.lock().await.take() {
            handle.abort();
        }
    }
}
