use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;

use crate::error::{BookmarkError, Result};
use crate::models::Config;

/// ConfigManager handles loading, saving, and updating application configuration.
///
/// A saved file only needs the fields the user changed; everything else keeps
/// its default value.
pub struct ConfigManager {
    config: RwLock<Config>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the given config file path.
    ///
    /// # Returns
    /// * `Ok(ConfigManager)` - Loaded from disk, or defaults when the file does not exist
    /// * `Err(BookmarkError::Config)` - If the file exists but cannot be read or parsed
    pub fn new(config_path: PathBuf) -> Result<Self> {
        let config = Self::load_from_file(&config_path)?;
        Ok(Self {
            config: RwLock::new(config),
            config_path,
        })
    }

    fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| BookmarkError::Config(format!("Failed to read config file: {}", e)))?;
        merge_config_with_defaults(&content)
    }

    /// Gets a clone of the current configuration.
    pub fn get(&self) -> Config {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Updates the configuration using a closure.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        f(&mut config);
    }

    /// Saves the configuration to disk immediately.
    pub fn save_sync(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.get())
            .map_err(|e| BookmarkError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BookmarkError::Config(format!("Failed to create config directory: {}", e)))?;
        }
        fs::write(&self.config_path, content)
            .map_err(|e| BookmarkError::Config(format!("Failed to write config file: {}", e)))
    }

    /// Returns the config file path.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Merges a partial config JSON with defaults.
///
/// Fields that are missing or have the wrong type keep their default value.
pub fn merge_config_with_defaults(partial_json: &str) -> Result<Config> {
    if partial_json.trim().is_empty() {
        return Ok(Config::default());
    }

    let json_value: Value = serde_json::from_str(partial_json)
        .map_err(|e| BookmarkError::Config(format!("Failed to parse config: {}", e)))?;

    let mut config = Config::default();

    if let Some(obj) = json_value.as_object() {
        if let Some(v) = obj.get("max_json_depth").and_then(Value::as_u64) {
            config.max_json_depth = v as usize;
        }
        if let Some(v) = obj.get("html_heading_search_depth").and_then(Value::as_u64) {
            config.html_heading_search_depth = v as usize;
        }
        if let Some(v) = obj.get("search_debounce_ms").and_then(Value::as_u64) {
            config.search_debounce_ms = v;
        }
        if let Some(v) = obj.get("pretty_export").and_then(Value::as_bool) {
            config.pretty_export = v;
        }
        if let Some(v) = obj.get("persist_on_load").and_then(Value::as_bool) {
            config.persist_on_load = v;
        }
        if let Some(v) = obj.get("browser_bookmarks_file") {
            config.browser_bookmarks_file = v.as_str().filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        }
    }

    Ok(config)
}
