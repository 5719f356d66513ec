//! Pluggable byte-oriented cache used as the snapshot publication slot.
//!
//! | Backend | Type | Notes |
//! |---|---|---|
//! | `memory` | [`MemoryStore`] | in-process map, optional TTL |
//! | `sled` | [`EmbeddedStore`] | on-disk, survives restarts |
//! | `redis` | [`RedisStore`] | networked, shared between instances |
//!
//! Exactly one backend is built per process by [`open_store`] and handed to
//! both the refresh scheduler and the query layer. Construction failures
//! (unreachable server, unopenable database) are returned as
//! [`StoreError::Config`] and are fatal at startup.
//!
//! The pipeline only ever touches [`SNAPSHOT_KEY`]. Each `set` replaces the
//! whole value, so readers observe either the previous snapshot or the next
//! one, never a mix.

mod embedded;
mod memory;
mod remote;

pub use embedded::EmbeddedStore;
pub use memory::MemoryStore;
pub use remote::RedisStore;

use crate::config::{CacheBackend, CacheConfig};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Cache key under which the serialized repository list is published.
pub const SNAPSHOT_KEY: &str = "Repos";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cache backend '{backend}' unavailable: {reason}")]
    Config { backend: &'static str, reason: String },
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Uniform get/set contract shared by every backend.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name as used in configuration.
    fn backend(&self) -> &'static str;

    /// Value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the value for `key`.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
}

/// Build the configured backend.
pub async fn open_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, StoreError> {
    let ttl = (config.ttl_secs > 0).then(|| Duration::from_secs(config.ttl_secs));

    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryStore::new(ttl)),
        CacheBackend::Sled => Arc::new(EmbeddedStore::open(&config.sled_path)?),
        CacheBackend::Redis => Arc::new(RedisStore::connect(&config.redis_url, ttl).await?),
    };

    tracing::info!(backend = store.backend(), ?ttl, "cache store ready");
    Ok(store)
}
