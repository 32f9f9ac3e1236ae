//! File-backed storage.
//!
//! All keys live in one JSON object on disk. Every mutation rewrites the
//! whole document through a temp file and a rename, so a crash mid-write
//! leaves either the old document or the new one, never a mix.

use crate::{SecureStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

type Document = BTreeMap<String, String>;

/// JSON document storage at a fixed path (`~/.quill/credentials.json`).
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within the process.
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Create storage backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> StorageResult<Document> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Document::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                StorageError::Encoding(format!("{}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, document: &Document) -> StorageResult<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let json = serde_json::to_string_pretty(document)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = open_private(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> StorageResult<()>
    where
        F: FnOnce(&mut Document) -> bool,
    {
        let _guard = self.write_lock.lock();
        // An undecodable document holds nothing recoverable; writes replace it.
        let (mut document, replaced) = match self.read_document() {
            Ok(document) => (document, false),
            Err(StorageError::Encoding(e)) => {
                warn!(error = %e, "Replacing unreadable credentials document");
                (Document::new(), true)
            }
            Err(e) => return Err(e),
        };
        if f(&mut document) || replaced {
            self.write_document(&document)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl SecureStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(path = %self.path.display(), key = %key, "Setting value");
        self.update(|doc| {
            doc.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.write_lock.lock();
        Ok(self.read_document()?.remove(key))
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(path = %self.path.display(), key = %key, "Deleting value");
        let mut removed = false;
        self.update(|doc| {
            removed = doc.remove(key).is_some();
            removed
        })?;
        Ok(removed)
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        debug!(path = %self.path.display(), count = entries.len(), "Setting values");
        self.update(|doc| {
            for (key, value) in entries {
                doc.insert(key.to_string(), value.to_string());
            }
            true
        })
    }

    fn delete_many(&self, keys: &[&str]) -> StorageResult<()> {
        debug!(path = %self.path.display(), count = keys.len(), "Deleting values");
        self.update(|doc| {
            let before = doc.len();
            for key in keys {
                doc.remove(*key);
            }
            doc.len() != before
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("credentials.json"));

        assert_eq!(storage.get("accessToken").unwrap(), None);
        assert!(!storage.delete("accessToken").unwrap());
        assert!(!storage.path().exists());
    }

    #[test]
    fn values_survive_a_new_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        FileStorage::new(&path)
            .set_many(&[("accessToken", "A1"), ("refreshToken", "R1")])
            .unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("accessToken").unwrap(), Some("A1".to_string()));
        assert_eq!(reopened.get("refreshToken").unwrap(), Some("R1".to_string()));
    }

    #[test]
    fn delete_many_removes_all_keys() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("credentials.json"));

        storage.set("accessToken", "A1").unwrap();
        storage.set("refreshToken", "R1").unwrap();
        storage.set("other", "kept").unwrap();
        storage.delete_many(&["accessToken", "refreshToken"]).unwrap();

        assert!(!storage.has("accessToken").unwrap());
        assert!(!storage.has("refreshToken").unwrap());
        assert!(storage.has("other").unwrap());
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let storage = FileStorage::new(&path);

        storage.set("accessToken", "A1").unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_document_is_an_encoding_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get("accessToken"),
            Err(StorageError::Encoding(_))
        ));
    }

    #[test]
    fn writes_replace_corrupt_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::new(&path);
        storage
            .set_many(&[("accessToken", "A1"), ("refreshToken", "R1")])
            .unwrap();

        assert_eq!(storage.get("accessToken").unwrap(), Some("A1".to_string()));
        assert_eq!(storage.get("refreshToken").unwrap(), Some("R1".to_string()));
    }

    #[test]
    fn delete_many_on_corrupt_document_leaves_it_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::new(&path);
        storage.delete_many(&["accessToken", "refreshToken"]).unwrap();

        assert_eq!(storage.get("accessToken").unwrap(), None);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "{}");
    }

    #[cfg(unix)]
    #[test]
    fn document_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        FileStorage::new(&path).set("accessToken", "A1").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
