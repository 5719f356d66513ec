use super::{CacheStore, StoreError};
use async_trait::async_trait;

/// On-disk store backed by sled.
///
/// Useful when the process restarts often: the last published snapshot is
/// still readable while priming runs again.
pub struct EmbeddedStore {
    db: sled::Db,
}

impl EmbeddedStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::Config {
            backend: "sled",
            reason: format!("cannot open {path}: {e}"),
        })?;
        Ok(Self { db })
    }
}

#[async_trait]
impl CacheStore for EmbeddedStore {
    fn backend(&self) -> &'static str {
        "sled"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.db.insert(key, value)?;
        self.db.flush_async().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn value_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db").to_string_lossy().to_string();
        {
            let store = EmbeddedStore::open(&path).unwrap();
            store.set("Repos", b"persisted".to_vec()).await.unwrap();
        }
        let store = EmbeddedStore::open(&path).unwrap();
        assert_eq!(store.get("Repos").await.unwrap(), Some(b"persisted".to_vec()));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = EmbeddedStore::open(&tmp.path().join("db").to_string_lossy()).unwrap();
        assert_eq!(store.get("nothing").await.unwrap(), None);
    }
}
