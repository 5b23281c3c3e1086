/// In-process session store with per-entry deadlines
///
/// Used by tests and by local development (`session_store.backend = "memory"`).
/// Expired entries are dropped lazily on access.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::SessionStore;
use crate::error::StoreError;

#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<String, (String, Instant)>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) records
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, deadline)| *deadline > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let deadline = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| StoreError::Command(format!("TTL of {}s is out of range", ttl.as_secs())))?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some((value, deadline)) if *deadline > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self.entries.write().await.remove(key);
        Ok(matches!(removed, Some((_, deadline)) if deadline > Instant::now()))
    }
}
