/// Session store
///
/// Key-value-with-TTL contract over the external store that decides which
/// session identifiers are currently valid. Keys are session UUID strings,
/// values are decimal user ids.

mod memory;
mod redis_store;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;

pub use self::memory::InMemorySessionStore;
pub use self::redis_store::RedisSessionStore;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Set `key` to `value`, expiring `ttl` from now
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Fetch `key`; `Ok(None)` when it expired or never existed
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove `key`, reporting whether a live record was removed.
    /// Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}
