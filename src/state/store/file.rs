use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::StoreEntries;
use super::StoreError;
use super::VaultStore;

/// A store backed by one JSON object on disk.
///
/// Every mutation rewrites the whole document to a sibling temp file and
/// renames it over the original, so readers and restarts see either the
/// previous document or the new one.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,

    // serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FileStore {
    /// A store at `path`. The file is created by the first write; its parent
    /// directory must exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read_document(&self) -> Result<Map<String, Value>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(Value::Object(document)) => Ok(document),
            Ok(_) => Err(StoreError::Corrupt(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(StoreError::Corrupt(format!("{}: {e}", self.path.display()))),
        }
    }

    async fn write_document(&self, document: &Map<String, Value>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let path_tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&path_tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        // rename is atomic on the filesystems we care about
        tokio::fs::rename(&path_tmp, &self.path).await?;
        debug!(path = %self.path.display(), "store document written");
        Ok(())
    }
}

#[async_trait]
impl VaultStore for FileStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreEntries, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        Ok(keys
            .iter()
            .filter_map(|k| document.remove(*k).map(|v| ((*k).to_owned(), v)))
            .collect())
    }

    async fn set(&self, entries: StoreEntries) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        document.extend(entries);
        self.write_document(&document).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        let before = document.len();
        for key in keys {
            document.remove(*key);
        }
        if document.len() == before {
            return Ok(());
        }
        self.write_document(&document).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use assert2::assert;
    use assert2::let_assert;
    use serde_json::json;

    use super::*;
    use crate::state::store::entries;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("vault.json"));

        assert!(store.get(&["passwordHash"]).await.unwrap().is_empty());
        store.remove(&["passwordHash"]).await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");

        FileStore::new(&path)
            .set(entries([("hasPassword", json!(true)), ("autoLockTime", json!(5))]))
            .await
            .unwrap();

        let reopened = FileStore::new(&path);
        let got = reopened.get(&["hasPassword", "autoLockTime"]).await.unwrap();
        assert!(got.get("hasPassword") == Some(&json!(true)));
        assert!(got.get("autoLockTime") == Some(&json!(5)));
        assert!(!reopened.tmp_path().exists());
    }

    #[tokio::test]
    async fn remove_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("vault.json"));
        store
            .set(entries([("a", json!(1)), ("b", json!(2))]))
            .await
            .unwrap();

        store.remove(&["a"]).await.unwrap();

        let got = store.get(&["a", "b"]).await.unwrap();
        assert!(got == entries([("b", json!(2))]));
    }

    #[tokio::test]
    async fn garbage_document_is_reported_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        tokio::fs::write(&path, b"[1, 2, 3]").await.unwrap();

        let_assert!(Err(StoreError::Corrupt(_)) = FileStore::new(&path).get(&["a"]).await);
    }

    #[tokio::test]
    async fn missing_parent_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent").join("vault.json"));

        let_assert!(Err(StoreError::Io(_)) = store.set(entries([("a", json!(1))])).await);
    }
}
