use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Folder name used when a bookmark has no folder context
pub const ROOT_FOLDER: &str = "Bookmarks";

/// Separator placed between nested folder names in a folder path
pub const FOLDER_SEPARATOR: &str = " > ";

/// Returns true when `url` may become a bookmark.
///
/// Blank URLs, the `#` placeholder and `javascript:` pseudo-URLs are rejected.
pub fn is_acceptable_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() || url == "#" {
        return false;
    }
    let scheme = url.get(..11).unwrap_or("");
    !scheme.eq_ignore_ascii_case("javascript:")
}

/// Appends `name` to `prefix`, treating an empty prefix as the top level.
pub fn join_folder(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", prefix, FOLDER_SEPARATOR, name)
    }
}

/// A single normalized bookmark.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Bookmark {
    pub title: String,
    pub url: String,
    pub folder: String,
    /// Creation time in unix seconds, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<i64>,
    /// Lowercase `title url folder`, filled in by `search::reindex`
    #[serde(skip)]
    pub search_key: Option<String>,
}

impl Bookmark {
    /// Builds a bookmark, or `None` when the URL is not acceptable.
    ///
    /// Blank titles fall back to the URL and a blank folder falls back to
    /// [`ROOT_FOLDER`]. Title and URL are trimmed.
    pub fn new(title: Option<&str>, url: &str, folder: &str, added: Option<i64>) -> Option<Self> {
        if !is_acceptable_url(url) {
            return None;
        }
        let url = url.trim().to_string();
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| url.clone());
        let folder = if folder.trim().is_empty() {
            ROOT_FOLDER.to_string()
        } else {
            folder.to_string()
        };

        Some(Self {
            title,
            url,
            folder,
            added,
            search_key: None,
        })
    }
}

/// The canonical list of bookmarks plus every folder path seen while building it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BookmarkCollection {
    pub bookmarks: Vec<Bookmark>,
    pub folders: BTreeSet<String>,
}

impl BookmarkCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a bookmark and records its folder.
    pub fn push(&mut self, bookmark: Bookmark) {
        self.folders.insert(bookmark.folder.clone());
        self.bookmarks.push(bookmark);
    }

    /// Records a folder path; empty paths are ignored.
    pub fn add_folder(&mut self, path: &str) {
        let path = path.trim();
        if !path.is_empty() {
            self.folders.insert(path.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }
}

/// A node of the browser's native bookmark tree.
///
/// Nodes with `children` are folders, nodes with a `url` and no children are
/// bookmarks. `date_added` is in milliseconds, as the browser bookmark API reports it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<i64>,
}

impl TreeNode {
    pub fn folder(title: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            title: title.into(),
            children: Some(children),
            ..Default::default()
        }
    }

    pub fn link(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: Some(url.into()),
            ..Default::default()
        }
    }
}

/// Export target format
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Html,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Json => "bookmarks.json",
            Self::Html => "bookmarks.html",
        }
    }
}

/// Counters shown next to the bookmark list
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub folder_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Generic result handed to the presentation layer
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmarks: Option<Vec<Bookmark>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl ApiResult {
    /// Create a successful result
    pub fn success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Create a success result with content
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Create a success result carrying the collection counters
    pub fn with_stats(stats: Stats) -> Self {
        Self {
            success: true,
            stats: Some(stats),
            ..Default::default()
        }
    }

    /// Create a success result with a bookmark list
    pub fn with_bookmarks(bookmarks: Vec<Bookmark>) -> Self {
        Self {
            success: true,
            bookmarks: Some(bookmarks),
            ..Default::default()
        }
    }
}

/// Application configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub max_json_depth: usize,
    pub html_heading_search_depth: usize,
    pub search_debounce_ms: u64,
    pub pretty_export: bool,
    pub persist_on_load: bool,
    pub browser_bookmarks_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_json_depth: 100,
            html_heading_search_depth: 10,
            search_debounce_ms: 250,
            pretty_export: true,
            persist_on_load: true,
            browser_bookmarks_file: None,
        }
    }
}
