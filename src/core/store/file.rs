//! Clear-text credential file
//!
//! Format: `{"entries":[{"name":"<namespace>","value":"<token>"}]}`, written
//! with owner-only permissions on every mutation.

use crate::core::store::{CredentialEntry, CredentialStore, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// File name of the store inside the home (or config) directory
pub const STORE_FILE_NAME: &str = ".vsxpub";

/// Environment variable relocating the store directory
pub const CONFIG_DIR_ENV: &str = "VSXPUB_CONFIG_DIR";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    entries: Vec<CredentialEntry>,
}

/// Credential store persisted as a JSON document
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<Vec<CredentialEntry>>,
}

impl FileStore {
    /// `$VSXPUB_CONFIG_DIR/.vsxpub` or `~/.vsxpub`
    pub fn default_path() -> StoreResult<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir).join(STORE_FILE_NAME));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| StoreError::Config("Failed to determine home directory".to_string()))?;
        Ok(home.join(STORE_FILE_NAME))
    }

    /// Load the store; a missing file is an empty store
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let document: StoreDocument =
                    serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                document.entries
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the backing file and forget all entries
    pub async fn delete_store(&self) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        }
        entries.clear();
        Ok(())
    }

    async fn save(&self, entries: &[CredentialEntry]) -> StoreResult<()> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(io_error)?;
        }

        let document = StoreDocument {
            entries: entries.to_vec(),
        };
        let content = serde_json::to_string_pretty(&document)
            .map_err(|e| StoreError::Config(format!("Failed to serialize credential store: {}", e)))?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await.map_err(io_error)?;
        tokio::io::AsyncWriteExt::write_all(&mut file, content.as_bytes())
            .await
            .map_err(io_error)?;
        tokio::io::AsyncWriteExt::flush(&mut file)
            .await
            .map_err(io_error)?;

        // mode() only applies on creation; tighten files that already existed
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(io_error)?;
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl CredentialStore for FileStore {
    async fn get(&self, namespace: &str) -> Option<String> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .find(|e| e.namespace == namespace)
            .map(|e| e.token.clone())
    }

    async fn add(&self, namespace: &str, token: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        let mut updated = entries.clone();
        match updated.iter_mut().find(|e| e.namespace == namespace) {
            Some(entry) => entry.token = token.to_string(),
            None => updated.push(CredentialEntry::new(namespace, token)),
        }
        self.save(&updated).await?;
        *entries = updated;
        Ok(())
    }

    async fn delete(&self, namespace: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        if !entries.iter().any(|e| e.namespace == namespace) {
            return Ok(());
        }
        let updated: Vec<CredentialEntry> = entries
            .iter()
            .filter(|e| e.namespace != namespace)
            .cloned()
            .collect();
        self.save(&updated).await?;
        *entries = updated;
        Ok(())
    }

    async fn entries(&self) -> Vec<CredentialEntry> {
        self.entries.lock().await.clone()
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join(".vsxpub")).await.unwrap();
        assert_eq!(store.size().await, 0);
        assert!(store.get("anything").await.is_none());
    }

    #[tokio::test]
    async fn test_add_get_delete() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".vsxpub");
        let store = FileStore::open(&path).await.unwrap();

        store.add("redhat", "first").await.unwrap();
        assert_eq!(store.get("redhat").await.as_deref(), Some("first"));

        store.add("redhat", "second").await.unwrap();
        assert_eq!(store.get("redhat").await.as_deref(), Some("second"));
        assert_eq!(store.size().await, 1);

        store.delete("redhat").await.unwrap();
        assert!(store.get("redhat").await.is_none());

        // Deleting an unknown namespace is not an error
        store.delete("redhat").await.unwrap();
    }

    #[tokio::test]
    async fn test_entries_persist_across_opens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(".vsxpub");
        let store = FileStore::open(&path).await.unwrap();
        store.add("a", "1").await.unwrap();
        store.add("b", "2").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["entries"][0]["name"], "a");
        assert_eq!(value["entries"][1]["value"], "2");

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.entries().await, store.entries().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_written_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".vsxpub");
        std::fs::write(&path, r#"{"entries":[]}"#).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileStore::open(&path).await.unwrap();
        store.add("ns", "secret").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".vsxpub");
        std::fs::write(&path, "{not json").unwrap();

        let result = FileStore::open(&path).await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_delete_store_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".vsxpub");
        let store = FileStore::open(&path).await.unwrap();
        store.add("ns", "secret").await.unwrap();
        assert!(path.exists());

        store.delete_store().await.unwrap();
        assert!(!path.exists());
        assert_eq!(store.size().await, 0);

        // Already gone
        store.delete_store().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_save_leaves_entries_untouched() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the store's parent directory should be
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = FileStore::open(blocker.join(".vsxpub")).await.unwrap();

        assert!(matches!(
            store.add("ns", "tok").await,
            Err(StoreError::Io { .. })
        ));
        assert!(store.get("ns").await.is_none());
        assert_eq!(store.size().await, 0);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_entry() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("config");
        let path = dir.join(".vsxpub");
        let store = FileStore::open(&path).await.unwrap();
        store.add("ns", "tok").await.unwrap();

        // Replace the directory with a file so the next save cannot happen
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, "").unwrap();

        assert!(store.delete("ns").await.is_err());
        assert_eq!(store.get("ns").await.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_all_kept() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".vsxpub");
        let store = std::sync::Arc::new(FileStore::open(&path).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.add(&format!("ns-{}", i), &format!("tok-{}", i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.size().await, 16);
    }
}
