use std::path::Path;

use crate::models::{ApiResult, ExportFormat};
use crate::storage::BookmarkStore;
use crate::viewer::BookmarkViewer;

/// Returns the bookmark and folder counters.
pub fn get_stats<S: BookmarkStore>(viewer: &BookmarkViewer<S>) -> ApiResult {
    ApiResult::with_stats(viewer.stats())
}

/// Returns the bookmarks matching `query`; a blank query returns all of them.
pub fn search_bookmarks<S: BookmarkStore>(viewer: &BookmarkViewer<S>, query: &str) -> ApiResult {
    let matches = viewer.search(query);
    log::debug!("Query {:?} matched {} bookmarks", query, matches.len());
    ApiResult::with_bookmarks(matches)
}

/// Exports the collection as JSON or Netscape HTML.
///
/// # Arguments
/// * `format` - `json` or `html`
/// * `output` - Where to write the export; when `None` the text is returned as content
pub async fn export_bookmarks<S: BookmarkStore>(
    viewer: &BookmarkViewer<S>,
    format: &str,
    output: Option<&Path>,
) -> ApiResult {
    let Some(format) = ExportFormat::parse(format) else {
        return ApiResult::error(format!("Unknown export format '{}'. Use json or html.", format));
    };
    if viewer.bookmarks().is_empty() {
        return ApiResult::error("No bookmarks to export.");
    }

    let content = match viewer.export(format) {
        Ok(content) => content,
        Err(e) => return ApiResult::error(e.to_string()),
    };

    match output {
        Some(path) => match tokio::fs::write(path, content).await {
            Ok(()) => ApiResult {
                file_path: Some(path.display().to_string()),
                ..ApiResult::success()
            },
            Err(e) => ApiResult::error(format!("Failed to write {}: {}", format.file_name(), e)),
        },
        None => ApiResult::with_content(content),
    }
}

/// Clears the collection and its persisted copy.
///
/// Succeeds even when the persisted copy could not be erased; the
/// in-memory collection is always cleared.
pub fn clear_bookmarks<S: BookmarkStore>(viewer: &mut BookmarkViewer<S>) -> ApiResult {
    if let Err(e) = viewer.clear() {
        log::warn!("Bookmarks cleared in memory only: {}", e);
    }
    ApiResult::with_stats(viewer.stats())
}
