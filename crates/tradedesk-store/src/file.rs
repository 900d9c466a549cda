//! JSON-file backend for native consoles.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::{KeyValueStore, StoreError, Write};

/// A [`KeyValueStore`] persisted as one JSON object in a file.
///
/// The whole map is cached in memory. Every batch rewrites the file by
/// writing a sibling `.tmp` file and renaming it over the original, so a
/// crash mid-write leaves either the old contents or the new ones.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens (or lazily creates) the store at `path`.
    ///
    /// A missing file is an empty store; parent directories are created
    /// on first write.
    ///
    /// # Errors
    /// - [`StoreError::Io`] if the file exists but can't be read
    /// - [`StoreError::Corrupt`] if it isn't a JSON object of strings
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                StoreError::Corrupt(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "file store opened");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.apply(&[Write::Set(key, value)])
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.apply(&[Write::Remove(key)])
    }

    fn apply(&self, writes: &[Write<'_>]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        for write in writes {
            match *write {
                Write::Set(key, value) => {
                    next.insert(key.to_string(), value.to_string());
                }
                Write::Remove(key) => {
                    next.remove(key);
                }
            }
        }
        if next == *entries {
            return Ok(());
        }
        // Memory only moves once the file has.
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("session.json")).unwrap();
        assert_eq!(store.get("auth_token").unwrap(), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/session.json");

        let store = FileStore::open(&path).unwrap();
        store.set("auth_token", "abc").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("auth_token").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_apply_removes_all_keys_in_one_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).unwrap();
        store
            .apply(&[Write::Set("a", "1"), Write::Set("b", "2")])
            .unwrap();

        store.apply(&[Write::Remove("a"), Write::Remove("b")]).unwrap();

        let on_disk = fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk.trim(), "{}");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_open_corrupt_file_returns_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let result = FileStore::open(&path);

        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_noop_batch_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).unwrap();

        store.remove("auth_token").unwrap();

        assert!(!path.exists());
    }
}
