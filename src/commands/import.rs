use std::path::Path;

use crate::models::ApiResult;
use crate::source::TreeSource;
use crate::storage::BookmarkStore;
use crate::viewer::BookmarkViewer;

/// Loads the browser's own bookmarks, replacing the current collection.
///
/// # Returns
/// ApiResult with the new stats, or the reason the source could not be read
pub async fn load_browser_bookmarks<S, T>(viewer: &mut BookmarkViewer<S>, source: &T) -> ApiResult
where
    S: BookmarkStore,
    T: TreeSource + Sync + ?Sized,
{
    match viewer.load_tree(source).await {
        Ok(stats) => ApiResult::with_stats(stats),
        Err(e) => ApiResult::error(format!("Failed to load browser bookmarks: {}", e)),
    }
}

/// Imports an HTML or JSON bookmark file from disk.
///
/// # Arguments
/// * `path` - The file to import; its extension selects the parser
pub async fn import_file<S: BookmarkStore>(viewer: &mut BookmarkViewer<S>, path: &Path) -> ApiResult {
    match viewer.load_file(path).await {
        Ok(stats) => ApiResult {
            file_path: Some(path.display().to_string()),
            ..ApiResult::with_stats(stats)
        },
        Err(e) => ApiResult::error(format!("Error loading file: {}", e)),
    }
}
