//! In-memory storage backend.

use crate::{SecureStorage, StorageResult};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Ephemeral storage. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}

impl SecureStorage for MemoryStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.data.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        Ok(self.data.lock().remove(key).is_some())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        let mut data = self.data.lock();
        for (key, value) in entries {
            data.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn delete_many(&self, keys: &[&str]) -> StorageResult<()> {
        let mut data = self.data.lock();
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();

        storage.set("test_key", "test_value").unwrap();
        assert_eq!(storage.get("test_key").unwrap(), Some("test_value".to_string()));

        assert!(storage.has("test_key").unwrap());
        assert!(!storage.has("nonexistent").unwrap());

        assert!(storage.delete("test_key").unwrap());
        assert!(!storage.delete("test_key").unwrap());
        assert_eq!(storage.get("test_key").unwrap(), None);
    }

    #[test]
    fn test_batch_operations() {
        let storage = MemoryStorage::new();

        storage.set_many(&[("a", "1"), ("b", "2")]).unwrap();
        assert_eq!(storage.len(), 2);

        storage.delete_many(&["a", "b", "missing"]).unwrap();
        assert!(storage.is_empty());
    }
}
