//! Storage adapters for the Legacy Radio SDK

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{LegacyRadioError, Result};

/// Storage keys
pub mod keys {
    /// Session token (JWT)
    pub const TOKEN: &str = "legacy-radio:token";
    /// Signed-in user profile, as JSON
    pub const USER: &str = "legacy-radio:user";
}

/// Storage adapter trait for custom storage implementations
pub trait StorageAdapter: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &str) -> Option<String>;

    /// Set a value by key
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value by key
    fn remove(&self, key: &str) -> Result<()>;
}

fn poisoned() -> LegacyRadioError {
    LegacyRadioError::storage("Storage lock poisoned")
}

/// In-memory storage adapter
///
/// Useful for testing or ephemeral storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    store: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create a new memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.store.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut store = self.store.write().map_err(|_| poisoned())?;
        store.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut store = self.store.write().map_err(|_| poisoned())?;
        store.remove(key);
        Ok(())
    }
}

/// File-based storage adapter
///
/// Stores data in a JSON file in the app's data directory.
#[cfg(feature = "native-storage")]
pub struct FileStorage {
    path: std::path::PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

#[cfg(feature = "native-storage")]
impl FileStorage {
    /// Create a new file storage for the given app name
    ///
    /// Data is stored in:
    /// - Linux: `~/.local/share/{app_name}/legacy-radio.json`
    /// - macOS: `~/Library/Application Support/{app_name}/legacy-radio.json`
    /// - Windows: `C:\Users\{User}\AppData\Roaming\{app_name}\legacy-radio.json`
    pub fn new(app_name: &str) -> Option<Self> {
        let dirs = directories::ProjectDirs::from("", "", app_name)?;
        let data_dir = dirs.data_dir();

        // Create directory if it doesn't exist
        std::fs::create_dir_all(data_dir).ok()?;

        Self::at(data_dir.join("legacy-radio.json"))
    }

    /// Create a file storage backed by an explicit file path
    pub fn at(path: impl Into<std::path::PathBuf>) -> Option<Self> {
        let path = path.into();

        // Load existing data
        let cache = if path.exists() {
            let contents = std::fs::read_to_string(&path).ok()?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            HashMap::new()
        };

        Some(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    /// Write the cache to disk
    fn save(&self) -> Result<()> {
        let cache = self.cache.read().map_err(|_| poisoned())?;
        let contents = serde_json::to_string_pretty(&*cache)
            .map_err(|e| LegacyRadioError::storage(format!("Failed to encode session: {}", e)))?;
        std::fs::write(&self.path, contents).map_err(|e| {
            LegacyRadioError::storage(format!(
                "Failed to write {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[cfg(feature = "native-storage")]
impl StorageAdapter for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.cache
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value.to_string());
        self.save()
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.cache.write().map_err(|_| poisoned())?.remove(key);
        self.save()
    }
}

#[cfg(feature = "native-storage")]
impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get(keys::TOKEN), None);

        storage.set(keys::TOKEN, "abc").unwrap();
        assert_eq!(storage.get(keys::TOKEN).as_deref(), Some("abc"));

        storage.remove(keys::TOKEN).unwrap();
        assert_eq!(storage.get(keys::TOKEN), None);
    }

    #[cfg(feature = "native-storage")]
    #[test]
    fn file_storage_persists_across_instances() {
        let path = std::env::temp_dir().join(format!(
            "legacy-radio-sdk-test-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let first = FileStorage::at(&path).unwrap();
        first.set(keys::USER, "{}").unwrap();

        let second = FileStorage::at(&path).unwrap();
        assert_eq!(second.get(keys::USER).as_deref(), Some("{}"));

        second.remove(keys::USER).unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[cfg(feature = "native-storage")]
    #[test]
    fn file_storage_reports_failed_writes() {
        let dir = std::env::temp_dir().join(format!(
            "legacy-radio-sdk-missing-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);

        // Parent directory does not exist, so the write must fail
        let storage = FileStorage::at(dir.join("legacy-radio.json")).unwrap();
        let err = storage.set(keys::TOKEN, "abc").unwrap_err();
        assert_eq!(err.code, crate::error::LegacyRadioErrorCode::StorageError);
    }
}
