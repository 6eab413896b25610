//! Local device storage
//!
//! A string key/value store scoped to this device, used to keep each
//! store's order between sessions. Nothing here is synced remotely.
//!
//! - **SQLite**: the default, one row per store in `catch.db`
//! - **Memory**: for tests and as the fallback when storage is unavailable

pub mod error;
pub mod persistence;
pub mod schema;
pub mod sqlite;

use std::collections::BTreeMap;

pub use error::{StorageError, StorageResult};
pub use persistence::atomic_write;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteStorage;

/// Key/value storage local to this device
pub trait LocalStorage: Send {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete the value under `key` (missing keys are fine)
    fn remove(&mut self, key: &str) -> StorageResult<()>;

    /// All keys, most recently written first where the backend knows
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// In-memory local storage
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let mut storage = MemoryStorage::new();
        storage.set("a", "1").unwrap();
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.keys().unwrap(), vec!["a".to_string()]);

        storage.remove("a").unwrap();
        storage.remove("a").unwrap();
        assert!(storage.get("a").unwrap().is_none());
    }
}
