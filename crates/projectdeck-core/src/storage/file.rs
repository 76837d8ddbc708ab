use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{KeyValueStore, StoreError};

/// Storage file name inside the data directory
pub const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StorageDocument {
    #[serde(default)]
    entries: BTreeMap<String, String>,
    updated_at: Option<DateTime<Utc>>,
}

/// Key-value store persisted as a single JSON file.
///
/// The whole document is rewritten on every change. All operations hold
/// an async lock so concurrent writers never interleave a read-modify-write.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at `<data_dir>/storage.json`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(STORAGE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<StorageDocument, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StorageDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Document to modify. A file that no longer parses is discarded so
    /// the store can recover on the next write.
    ///
    /// Returns the document and whether the file on disk was unreadable.
    async fn read_document_for_write(&self) -> Result<(StorageDocument, bool), StoreError> {
        match self.read_document().await {
            Ok(doc) => Ok((doc, false)),
            Err(StoreError::Serialization(e)) => {
                warn!(path = ?self.path, error = %e, "Storage file is corrupt, starting over");
                Ok((StorageDocument::default(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| STORAGE_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_document(&self, mut doc: StorageDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        doc.updated_at = Some(Utc::now());
        let contents = serde_json::to_string_pretty(&doc)?;

        // Write then rename so a crash never leaves a half-written document
        let temp = self.temp_path();
        tokio::fs::write(&temp, contents).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!(path = ?self.path, entries = doc.entries.len(), "Storage file written");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        let doc = self.read_document().await?;
        Ok(doc.entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let (mut doc, _) = self.read_document_for_write().await?;
        doc.entries.insert(key.to_string(), value.to_string());
        self.write_document(doc).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let (mut doc, corrupt) = self.read_document_for_write().await?;
        if doc.entries.remove(key).is_none() && !corrupt {
            return Ok(());
        }
        self.write_document(doc).await
    }
}
