//! Key-value substrates for the browser adapter.
//!
//! The browser adapter only needs `localStorage` semantics: string keys,
//! string values, whole-value reads and writes. Three substrates provide them:
//!
//! - [`LocalStorage`]: the real `window.localStorage` (wasm32 only)
//! - [`FileStorage`]: one JSON object on disk, for native hosts and the CLI
//! - [`MemoryStorage`]: process memory, for tests and throwaway sessions

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::PathBuf;

use super::MaybeSendSync;
use crate::error::{Error, Result};

/// `localStorage`-shaped storage
pub trait KeyValueStore: MaybeSendSync {
    /// Read a value
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    /// Write a value
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    /// Remove a value; absent keys are fine
    fn remove_item(&self, key: &str) -> Result<()>;
}

// ============================================================================
// MEMORY
// ============================================================================

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }
}

// ============================================================================
// FILE
// ============================================================================

/// Storage persisted as a single JSON object of string values
///
/// Every call reads the file; writes go to a temp file that is renamed over
/// the original. A file that cannot be parsed is logged and treated as
/// empty, and the next write replaces it.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Use (or later create) the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(Error::StorageReadError(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        match serde_json::from_str(&contents) {
            Ok(items) => Ok(items),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "Key-value file is corrupted, starting fresh"
                );
                Ok(HashMap::new())
            }
        }
    }

    fn persist(&self, items: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(items)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::StorageWriteError(format!("{}: {}", parent.display(), e)))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .map_err(|e| Error::StorageWriteError(format!("{}: {}", tmp_path.display(), e)))?;
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(Error::StorageWriteError(format!(
                "{}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut HashMap<String, String>)) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut items = self.load()?;
        f(&mut items);
        self.persist(&items)
    }
}

impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.modify(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.modify(|items| {
            items.remove(key);
        })
    }
}

// ============================================================================
// LOCAL STORAGE (WASM)
// ============================================================================

/// `window.localStorage`
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    /// Whether `localStorage` is reachable in this context
    pub fn is_available() -> bool {
        Self::storage().is_ok()
    }

    fn storage() -> Result<web_sys::Storage> {
        web_sys::window()
            .ok_or_else(|| Error::NotConfigured("no window object".into()))?
            .local_storage()
            .map_err(|e| Error::StorageReadError(format!("{:?}", e)))?
            .ok_or_else(|| Error::NotConfigured("localStorage is disabled".into()))
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| Error::StorageReadError(format!("{:?}", e)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| Error::StorageWriteError(format!("{:?}", e)))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| Error::StorageWriteError(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let store = MemoryStorage::new();
        assert_eq!(store.get_item("k").unwrap(), None);
        store.set_item("k", "v").unwrap();
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("v"));
        store.remove_item("k").unwrap();
        store.remove_item("k").unwrap();
        assert_eq!(store.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("kv.json");

        FileStorage::new(&path).set_item("userId", "user-1").unwrap();
        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get_item("userId").unwrap().as_deref(), Some("user-1"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupted_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStorage::new(&path);
        assert_eq!(store.get_item("checklists").unwrap(), None);
        store.set_item("checklists", "[]").unwrap();
        assert_eq!(store.get_item("checklists").unwrap().as_deref(), Some("[]"));
    }
}
