//! Durable storage of source values
//!
//! Values are stored as strings under `prefix + source name`. Writes are
//! best-effort: a backend that fails to write logs the failure and carries on.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::PersistenceError;

/// Get/set of named values in durable storage
pub trait PersistenceAdapter: Send {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str);
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// In-memory store
///
/// Clones share the same map, so a host (or a test) can keep a handle and
/// inspect what the engine saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<FxHashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        {
            let mut map = store.entries.write().unwrap_or_else(PoisonError::into_inner);
            for (key, value) in entries {
                map.insert(key.into(), value.into());
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistenceAdapter for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

// =============================================================================
// JSON FILE
// =============================================================================

/// Store backed by a JSON object of strings
///
/// The file is read once on open and rewritten in full on every set.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open `path`, starting empty if the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "opened state file");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries in key order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    fn flush(&self) -> Result<(), PersistenceError> {
        let text = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

impl PersistenceAdapter for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
        if let Err(err) = self.flush() {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to write state file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let mut handle = store.clone();
        handle.set("data-mesh-a", "3");

        assert_eq!(store.get("data-mesh-a").as_deref(), Some("3"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("data-mesh-b"), None);
    }

    #[test]
    fn test_memory_store_with_entries() {
        let store = MemoryStore::with_entries([("k", "v")]);
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_json_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("data-mesh-a"), None);
        store.set("data-mesh-a", "12.5");
        store.set("data-mesh-b", "3");

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("data-mesh-a").as_deref(), Some("12.5"));
        assert_eq!(
            reopened.entries().collect::<Vec<_>>(),
            vec![("data-mesh-a", "12.5"), ("data-mesh-b", "3")]
        );
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "[1, 2").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(PersistenceError::Json(_))
        ));
    }

    #[test]
    fn test_json_store_empty_file_is_empty() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let store = JsonFileStore::open(file.path()).unwrap();
        assert_eq!(store.entries().count(), 0);
    }
}
