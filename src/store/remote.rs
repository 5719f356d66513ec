use super::{CacheStore, StoreError};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Networked store backed by Redis.
///
/// Lets several server instances share one published snapshot. The
/// connection is verified with `PING` when the store is built; a dead server
/// is a startup failure, not a request-time one.
pub struct RedisStore {
    conn: ConnectionManager,
    ttl: Option<Duration>,
}

impl RedisStore {
    pub async fn connect(url: &str, ttl: Option<Duration>) -> Result<Self, StoreError> {
        let unavailable = |reason: String| StoreError::Config {
            backend: "redis",
            reason,
        };

        let client = redis::Client::open(url).map_err(|e| unavailable(e.to_string()))?;
        let mut conn = ConnectionManager::new(client)
            .await
            .map_err(|e| unavailable(format!("cannot connect to {url}: {e}")))?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| unavailable(format!("PING failed: {e}")))?;
        if pong != "PONG" {
            return Err(unavailable(format!("unexpected PING reply: {pong}")));
        }

        Ok(Self { conn, ttl })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        match self.ttl {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }
}
