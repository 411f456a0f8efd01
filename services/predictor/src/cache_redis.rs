use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::cache::{CacheError, CacheStore};

/// Redis-backed cache store. Every command is bounded by `timeout`.
pub struct RedisCacheStore {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisCacheStore {
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(store_err)?;
        let conn = bounded(timeout, ConnectionManager::new(client)).await?;
        Ok(Self { conn, timeout })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        bounded(self.timeout, conn.get::<_, Option<Vec<u8>>>(key)).await
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                let mut cmd = redis::cmd("SET");
                cmd.arg(key).arg(value).arg("EX").arg(ttl.as_secs().max(1));
                bounded(self.timeout, cmd.query_async::<_, ()>(&mut conn)).await
            }
            None => bounded(self.timeout, conn.set::<_, _, ()>(key, value)).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        bounded(self.timeout, conn.del::<_, ()>(key)).await
    }
}

async fn bounded<T>(
    timeout: Duration,
    fut: impl Future<Output = redis::RedisResult<T>>,
) -> Result<T, CacheError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CacheError::Timeout)?
        .map_err(store_err)
}

fn store_err(e: redis::RedisError) -> CacheError {
    CacheError::Store(e.to_string())
}
