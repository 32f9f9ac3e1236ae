//! Storage trait definitions.

use crate::StorageResult;

/// Trait for credential storage backends
pub trait SecureStorage: Send + Sync {
    /// Store a value
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Store several values as one write.
    ///
    /// Backends that can commit a batch atomically override this. The
    /// default falls back to sequential `set` calls.
    fn set_many(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Delete several values as one write.
    fn delete_many(&self, keys: &[&str]) -> StorageResult<()> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}
