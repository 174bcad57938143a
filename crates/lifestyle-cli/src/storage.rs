//! File-backed [`Persistence`]: a flat JSON object on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use lifestyle_core::error::CoreError;
use lifestyle_core::system::Persistence;
use tracing::warn;

pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    /// Open `path`. A missing file is empty storage; an unreadable one is
    /// treated as empty and overwritten on the next save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring corrupt storage file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    /// `<data_dir>/lifestyle-widget/storage.json`, if the platform has a
    /// data dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("lifestyle-widget").join("storage.json"))
    }

    fn flush(&self) -> Result<(), CoreError> {
        let storage_err =
            |e: std::io::Error| CoreError::Storage(format!("{}: {e}", self.path.display()));
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let text = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| CoreError::Storage(e.to_string()))?;
        fs::write(&self.path, text).map_err(storage_err)
    }
}

impl Persistence for FileStorage {
    fn save(&mut self, key: &str, data: &str) -> Result<(), CoreError> {
        self.entries.insert(key.to_string(), data.to_string());
        self.flush()
    }

    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn remove(&mut self, key: &str) -> Result<(), CoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
