use std::collections::HashMap;

use crate::error::CoreError;

/// Key-value string storage.
///
/// The platform interface stores raw strings. Serialization is the caller's
/// responsibility, not the platform's.
///
/// Implementations: in-memory map, a JSON file under the user data dir,
/// browser localStorage.
pub trait Persistence {
    /// Write a string value under key.
    fn save(&mut self, key: &str, data: &str) -> Result<(), CoreError>;

    /// Read a string value by key. Returns None if not found.
    fn load(&self, key: &str) -> Option<String>;

    /// Remove a key from storage.
    fn remove(&mut self, key: &str) -> Result<(), CoreError>;
}

/// Process-lifetime storage. Values survive for as long as the value does.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for MemoryStorage {
    fn save(&mut self, key: &str, data: &str) -> Result<(), CoreError> {
        self.entries.insert(key.to_string(), data.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn remove(&mut self, key: &str) -> Result<(), CoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
