//! File-backed selection store
//!
//! Keeps entries in a single JSON object on disk. Writes go to a sibling
//! temporary file first and are renamed into place, so a crash mid-write
//! never leaves a truncated file behind.

use crate::error::StoreError;
use crate::repository::SelectionStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Selection store persisted as a JSON file
pub struct FileSelectionStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within the process
    write_lock: Mutex<()>,
}

impl FileSelectionStore {
    /// Create a store backed by `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), entries = entries.len(), "Selection file written");
        Ok(())
    }
}

#[async_trait]
impl SelectionStore for FileSelectionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.load().await?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.save(&entries).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SELECTED_CLINIC_KEY;

    #[tokio::test]
    async fn test_missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSelectionStore::new(dir.path().join("selection.json"));

        assert!(store.get(SELECTED_CLINIC_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("selection.json");

        let store = FileSelectionStore::new(&path);
        store.set(SELECTED_CLINIC_KEY, "c2").await.unwrap();
        drop(store);

        let reopened = FileSelectionStore::new(&path);
        assert_eq!(reopened.get(SELECTED_CLINIC_KEY).await.unwrap().as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_delete_keeps_other_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSelectionStore::new(dir.path().join("selection.json"));

        store.set(SELECTED_CLINIC_KEY, "c1").await.unwrap();
        store.set("praxis.theme", "dark").await.unwrap();
        store.delete(SELECTED_CLINIC_KEY).await.unwrap();

        assert!(store.get(SELECTED_CLINIC_KEY).await.unwrap().is_none());
        assert_eq!(store.get("praxis.theme").await.unwrap().as_deref(), Some("dark"));

        // Absent key is not an error
        store.delete(SELECTED_CLINIC_KEY).await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileSelectionStore::new(&path);
        let err = store.get(SELECTED_CLINIC_KEY).await.unwrap_err();
        assert!(matches!(err, StoreError::Deserialization(_)));
    }
}
