use async_trait::async_trait;
use redis::{AsyncCommands, RedisResult};

use cine_domain::error::BookingError;
use cine_domain::repository::LockStore;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn cache_get(&self, key: &str) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(key).await
    }

    /// One MGET over the whole key batch; missing keys come back as `None`
    /// in the same positions.
    pub async fn cache_get_many(&self, keys: &[String]) -> RedisResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("MGET").arg(keys).query_async(&mut conn).await
    }

    pub async fn cache_set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await
    }

    pub async fn cache_del(&self, key: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(key).await
    }

    /// Create-only set: succeeds exactly once per key until the TTL expires
    /// or the key is deleted.
    pub async fn set_nx_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // SET NX: only set if key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(result.is_some())
    }
}

#[async_trait]
impl LockStore for RedisClient {
    async fn try_lock(
        &self,
        key: &str,
        token: &str,
        ttl_seconds: u64,
    ) -> Result<bool, BookingError> {
        self.set_nx_ex(key, token, ttl_seconds)
            .await
            .map_err(|e| BookingError::Infrastructure(e.into()))
    }

    async fn unlock(&self, key: &str) -> Result<(), BookingError> {
        self.cache_del(key)
            .await
            .map_err(|e| BookingError::Infrastructure(e.into()))
    }
}
