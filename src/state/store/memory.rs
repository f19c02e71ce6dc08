use async_trait::async_trait;
use tokio::sync::Mutex;

use super::StoreEntries;
use super::StoreError;
use super::VaultStore;

/// Volatile store, for tests and for hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<StoreEntries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: StoreEntries) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Copy of everything currently stored.
    pub async fn snapshot(&self) -> StoreEntries {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl VaultStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreEntries, StoreError> {
        let entries = self.entries.lock().await;
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(*k).map(|v| ((*k).to_owned(), v.clone())))
            .collect())
    }

    async fn set(&self, new_entries: StoreEntries) -> Result<(), StoreError> {
        self.entries.lock().await.extend(new_entries);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::state::store::entries;

    #[tokio::test]
    async fn get_omits_absent_keys() {
        let store = MemoryStore::new();
        store.set(entries([("a", json!(1))])).await.unwrap();

        let got = store.get(&["a", "b"]).await.unwrap();
        assert_eq!(1, got.len());
        assert_eq!(Some(&json!(1)), got.get("a"));
    }

    #[tokio::test]
    async fn set_overwrites_and_remove_is_idempotent() {
        let store = MemoryStore::new();
        store.set(entries([("a", json!(1)), ("b", json!(2))])).await.unwrap();
        store.set(entries([("a", json!("x"))])).await.unwrap();

        store.remove(&["b", "missing"]).await.unwrap();
        store.remove(&["b"]).await.unwrap();

        let snapshot = store.snapshot().await;
        assert_eq!(entries([("a", json!("x"))]), snapshot);
    }
}
