use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{BookmarkError, Result};
use crate::json::chromium_time_to_unix;
use crate::models::TreeNode;

/// Provider of the browser's native bookmark tree.
#[async_trait]
pub trait TreeSource {
    /// Short label describing where the bookmarks came from
    fn label(&self) -> String;

    /// Retrieves the whole tree, failing with `SourceUnavailable`.
    async fn get_tree(&self) -> Result<Vec<TreeNode>>;
}

/// Location of the default Chrome profile's `Bookmarks` file.
#[cfg(target_os = "windows")]
pub fn default_bookmarks_file() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("Google").join("Chrome").join("User Data").join("Default").join("Bookmarks"))
}

/// Location of the default Chrome profile's `Bookmarks` file.
#[cfg(target_os = "macos")]
pub fn default_bookmarks_file() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("Google").join("Chrome").join("Default").join("Bookmarks"))
}

/// Location of the default Chrome profile's `Bookmarks` file.
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub fn default_bookmarks_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("google-chrome").join("Default").join("Bookmarks"))
}

#[derive(Deserialize)]
struct ChromiumFile {
    roots: Map<String, Value>,
}

#[derive(Deserialize)]
struct ChromiumNode {
    #[serde(default)]
    children: Option<Vec<ChromiumNode>>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "type")]
    node_type: String,
    #[serde(default)]
    date_added: String,
}

impl ChromiumNode {
    fn into_tree_node(self) -> TreeNode {
        let date_added = self
            .date_added
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(chromium_time_to_unix)
            .map(|secs| secs * 1000);

        if self.node_type == "url" || (self.url.is_some() && self.children.is_none()) {
            return TreeNode {
                title: self.name,
                url: self.url,
                children: None,
                date_added,
            };
        }

        let children = self
            .children
            .unwrap_or_default()
            .into_iter()
            .map(ChromiumNode::into_tree_node)
            .collect();
        TreeNode {
            title: self.name,
            url: None,
            children: Some(children),
            date_added,
        }
    }
}

/// Reads a Chromium profile `Bookmarks` file and presents it as the tree the
/// browser bookmark API returns: an untitled root whose children are the
/// profile's top-level folders, in file order.
#[derive(Debug, Clone)]
pub struct ChromiumProfileSource {
    bookmarks_file: PathBuf,
}

impl ChromiumProfileSource {
    pub fn new(bookmarks_file: impl Into<PathBuf>) -> Self {
        Self {
            bookmarks_file: bookmarks_file.into(),
        }
    }

    /// Uses the default Chrome profile of the current user.
    pub fn default_profile() -> Result<Self> {
        default_bookmarks_file()
            .map(Self::new)
            .ok_or_else(|| BookmarkError::SourceUnavailable("Could not locate the browser profile".to_string()))
    }

    pub fn bookmarks_file(&self) -> &Path {
        &self.bookmarks_file
    }
}

/// Converts the contents of a Chromium `Bookmarks` file into a tree.
pub fn parse_chromium_tree(text: &str) -> Result<Vec<TreeNode>> {
    let file: ChromiumFile = serde_json::from_str(text)
        .map_err(|e| BookmarkError::SourceUnavailable(format!("Unreadable bookmarks file: {}", e)))?;

    // `roots` may also hold bookkeeping scalars such as sync_transaction_version
    let top_level = file
        .roots
        .into_iter()
        .filter(|(_, value)| value.is_object())
        .filter_map(|(key, value)| match serde_json::from_value::<ChromiumNode>(value) {
            Ok(node) => Some(node.into_tree_node()),
            Err(e) => {
                log::warn!("Skipping malformed bookmark root '{}': {}", key, e);
                None
            }
        })
        .collect();

    Ok(vec![TreeNode::folder("", top_level)])
}

#[async_trait]
impl TreeSource for ChromiumProfileSource {
    fn label(&self) -> String {
        "Browser Bookmarks".to_string()
    }

    async fn get_tree(&self) -> Result<Vec<TreeNode>> {
        let text = tokio::fs::read_to_string(&self.bookmarks_file).await.map_err(|e| {
            BookmarkError::SourceUnavailable(format!(
                "Failed to read {}: {}",
                self.bookmarks_file.display(),
                e
            ))
        })?;
        parse_chromium_tree(&text)
    }
}

/// File formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Html,
    Json,
}

impl SourceFormat {
    /// Maps a file extension to a format, failing with `UnsupportedFormat`.
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(BookmarkError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// An uploaded file: its name and text content.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub name: String,
    pub content: String,
}

impl Upload {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Lowercased text after the last `.` of the file name, or empty.
    pub fn extension(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => String::new(),
        }
    }

    pub fn format(&self) -> Result<SourceFormat> {
        SourceFormat::from_extension(&self.extension())
    }
}

/// Reads a file as an upload.
///
/// Fails with `Io` when the file cannot be read, is not UTF-8 text, or is empty.
pub async fn read_upload(path: &Path) -> Result<Upload> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| BookmarkError::Io("No file provided".to_string()))?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| BookmarkError::Io(format!("{}: {}", path.display(), e)))?;
    let content = String::from_utf8(bytes)
        .map_err(|_| BookmarkError::Io("File content is not text-readable".to_string()))?;
    if content.trim().is_empty() {
        return Err(BookmarkError::Io("File appears to be empty".to_string()));
    }

    Ok(Upload { name, content })
}
