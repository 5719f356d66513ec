use super::{CacheStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// In-process store backed by a concurrent map.
///
/// Values are kept as `Arc<[u8]>`, so a `set` swaps the whole entry in one
/// step and concurrent readers keep whichever value they already fetched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    ttl: Option<Duration>,
}

#[derive(Debug, Clone)]
struct Entry {
    value: Arc<[u8]>,
    expires_at: Option<Instant>,
}

impl MemoryStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entry = match self.entries.get(key) {
            Some(e) => e.value().clone(),
            None => return Ok(None),
        };
        if entry.expires_at.is_some_and(|t| Instant::now() >= t) {
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let entry = Entry {
            value: Arc::from(value),
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }
}
