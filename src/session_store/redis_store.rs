/// Redis-backed session store
///
/// `SET key value EX ttl`, `GET key`, `DEL key` over one multiplexed
/// connection. Failures surface immediately; nothing is retried here.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::time::Duration;

use super::SessionStore;
use crate::error::StoreError;

#[derive(Clone)]
pub struct RedisSessionStore {
    connection: MultiplexedConnection,
}

impl RedisSessionStore {
    /// Open a multiplexed connection to `url`
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the server cannot be reached
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|e| {
            tracing::error!("Invalid Redis URL: {}", e);
            StoreError::Connection(format!("invalid Redis URL: {}", e))
        })?;

        let connection = client.get_multiplexed_async_connection().await?;
        tracing::info!("Connected to Redis session store");

        Ok(Self { connection })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        // EX rejects 0; round sub-second TTLs up.
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.connection.clone();

        conn.set_ex::<_, _, ()>(key, value, seconds).await.map_err(|e| {
            tracing::error!(operation = "set", "Session store command failed: {}", e);
            StoreError::from(e)
        })
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();

        conn.get::<_, Option<String>>(key).await.map_err(|e| {
            tracing::error!(operation = "get", "Session store command failed: {}", e);
            StoreError::from(e)
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();

        let removed = conn.del::<_, u32>(key).await.map_err(|e| {
            tracing::error!(operation = "delete", "Session store command failed: {}", e);
            StoreError::from(e)
        })?;

        Ok(removed > 0)
    }
}
