use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{BookmarkError, Result};
use crate::models::{is_acceptable_url, Bookmark, BookmarkCollection};

/// Key holding the serialized bookmark list
pub const BOOKMARKS_KEY: &str = "bookmarks";
/// Key holding the serialized folder list
pub const FOLDERS_KEY: &str = "folders";
/// Key holding the label of the source the bookmarks came from
pub const SOURCE_KEY: &str = "source";

/// Validates a store key before it is turned into a file name.
///
/// Rejects keys that contain `..`, `/` or `\`, and keys that would resolve
/// outside `base_dir`.
pub fn validate_path(base_dir: &Path, key: &str) -> Result<PathBuf> {
    if key.trim().is_empty() {
        return Err(BookmarkError::Persistence("Key must not be empty".to_string()));
    }
    if key.contains("..") {
        return Err(BookmarkError::Persistence(
            "Key contains invalid traversal pattern '..'".to_string(),
        ));
    }
    if key.contains('/') {
        return Err(BookmarkError::Persistence("Key contains invalid separator '/'".to_string()));
    }
    if key.contains('\\') {
        return Err(BookmarkError::Persistence("Key contains invalid separator '\\'".to_string()));
    }

    let full_path = base_dir.join(format!("{}.json", key));
    if !full_path.starts_with(base_dir) {
        return Err(BookmarkError::Persistence(
            "Key resolves outside of the store directory".to_string(),
        ));
    }
    Ok(full_path)
}

/// Durable key/value store used to keep the collection between sessions.
pub trait BookmarkStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Application data directory layout.
///
/// - `{base_dir}/store/` - one file per persisted key
/// - `{base_dir}/config.json` - user configuration
#[derive(Debug, Clone)]
pub struct DataDir {
    pub base_dir: PathBuf,
    pub store_dir: PathBuf,
    pub config_file: PathBuf,
}

impl DataDir {
    /// Uses the platform data directory.
    ///
    /// On Linux: ~/.local/share/bookmark-viewer/
    /// On macOS: ~/Library/Application Support/bookmark-viewer/
    /// On Windows: C:\Users\{user}\AppData\Roaming\bookmark-viewer\
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| BookmarkError::Persistence("Could not determine data directory".to_string()))?
            .join("bookmark-viewer");
        Ok(Self::new_with_base(&base_dir))
    }

    /// Uses a custom base directory. Useful for testing.
    pub fn new_with_base(base_dir: &Path) -> Self {
        let base_dir = base_dir.to_path_buf();
        Self {
            store_dir: base_dir.join("store"),
            config_file: base_dir.join("config.json"),
            base_dir,
        }
    }

    /// Creates the base and store directories if they are missing.
    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.store_dir)
            .map_err(|e| BookmarkError::Persistence(format!("Failed to create store directory: {}", e)))
    }
}

/// Store keeping each key in its own file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_data_dir(data_dir: &DataDir) -> Self {
        Self::new(&data_dir.store_dir)
    }
}

impl BookmarkStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = validate_path(&self.dir, key)?;
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| BookmarkError::Persistence(format!("Failed to read '{}': {}", key, e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = validate_path(&self.dir, key)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| BookmarkError::Persistence(format!("Failed to create store directory: {}", e)))?;
        fs::write(&path, value)
            .map_err(|e| BookmarkError::Persistence(format!("Failed to write '{}': {}", key, e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = validate_path(&self.dir, key)?;
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(&path)
            .map_err(|e| BookmarkError::Persistence(format!("Failed to remove '{}': {}", key, e)))
    }
}

/// In-memory store, optionally failing every write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: bool,
    fail_key: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `set` and `remove` always fail.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    /// Makes every later `set` of `key` fail; other keys keep working.
    pub fn fail_writes_to(&self, key: &str) {
        *self.fail_key.lock().unwrap_or_else(|e| e.into_inner()) = Some(key.to_string());
    }

    fn rejects(&self, key: &str) -> bool {
        self.fail_writes
            || self
                .fail_key
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .as_deref()
                == Some(key)
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| BookmarkError::Persistence("Store lock poisoned".to_string()))
    }
}

impl BookmarkStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.rejects(key) {
            return Err(BookmarkError::Persistence("Storage quota exceeded".to_string()));
        }
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.fail_writes {
            return Err(BookmarkError::Persistence("Storage is read-only".to_string()));
        }
        self.entries()?.remove(key);
        Ok(())
    }
}

/// A collection restored from the store together with its source label.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub collection: BookmarkCollection,
    pub source: String,
}

/// Writes the three persisted entries.
///
/// When any write fails the entries are erased again, so a later restore
/// never sees a mix of old and new state.
pub fn save_snapshot(store: &dyn BookmarkStore, collection: &BookmarkCollection, source: &str) -> Result<()> {
    let bookmarks = serde_json::to_string(&collection.bookmarks)
        .map_err(|e| BookmarkError::Persistence(format!("Failed to serialize bookmarks: {}", e)))?;
    let folders = serde_json::to_string(&collection.folders)
        .map_err(|e| BookmarkError::Persistence(format!("Failed to serialize folders: {}", e)))?;

    let written = store
        .set(BOOKMARKS_KEY, &bookmarks)
        .and_then(|_| store.set(FOLDERS_KEY, &folders))
        .and_then(|_| store.set(SOURCE_KEY, source));

    if let Err(e) = written {
        if let Err(cleanup) = erase_snapshot(store) {
            log::warn!("Failed to remove partially saved bookmarks: {}", cleanup);
        }
        return Err(e);
    }
    Ok(())
}

/// Reads the persisted entries back.
///
/// Missing, partial or corrupt state yields `None`; the reason is logged.
pub fn load_snapshot(store: &dyn BookmarkStore) -> Option<Snapshot> {
    match try_load_snapshot(store) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::warn!("Ignoring persisted bookmarks: {}", e);
            None
        }
    }
}

fn try_load_snapshot(store: &dyn BookmarkStore) -> Result<Option<Snapshot>> {
    let (Some(bookmarks), Some(folders), Some(source)) = (
        store.get(BOOKMARKS_KEY)?,
        store.get(FOLDERS_KEY)?,
        store.get(SOURCE_KEY)?,
    ) else {
        return Ok(None);
    };

    let bookmarks: Vec<Bookmark> = serde_json::from_str(&bookmarks)
        .map_err(|e| BookmarkError::Persistence(format!("Corrupt bookmark list: {}", e)))?;
    let mut folders: BTreeSet<String> = serde_json::from_str(&folders)
        .map_err(|e| BookmarkError::Persistence(format!("Corrupt folder list: {}", e)))?;

    if bookmarks.is_empty() {
        return Ok(None);
    }
    if let Some(bad) = bookmarks
        .iter()
        .find(|b| !is_acceptable_url(&b.url) || b.title.trim().is_empty())
    {
        return Err(BookmarkError::Persistence(format!(
            "Corrupt bookmark entry for url {:?}",
            bad.url
        )));
    }

    folders.extend(bookmarks.iter().map(|b| b.folder.clone()));
    Ok(Some(Snapshot {
        collection: BookmarkCollection { bookmarks, folders },
        source,
    }))
}

/// Erases all persisted entries, attempting every key even if one fails.
pub fn erase_snapshot(store: &dyn BookmarkStore) -> Result<()> {
    let results = [
        store.remove(BOOKMARKS_KEY),
        store.remove(FOLDERS_KEY),
        store.remove(SOURCE_KEY),
    ];
    results.into_iter().collect()
}
