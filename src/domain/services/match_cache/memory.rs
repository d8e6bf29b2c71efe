use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{MatchCache, MatchCacheError};
use crate::domain::models::events::MatchRecord;

/// In-memory match cache with per-entry TTL.
///
/// Expired entries are evicted lazily on read and on write; there is no
/// background sweeper. Suitable for single-process deployments and tests;
/// multi-instance deployments want a shared external cache behind the same
/// trait.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMatchCache {
    inner: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    record: MatchRecord,
    expires_at: Instant,
}

impl InMemoryMatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .lock()
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MatchCache for InMemoryMatchCache {
    async fn get(&self, key: &str) -> Result<Option<MatchRecord>, MatchCacheError> {
        let mut inner = self.inner.lock();

        match inner.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.record.clone())),
            Some(_) => {
                inner.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        record: MatchRecord,
        ttl_secs: u64,
    ) -> Result<(), MatchCacheError> {
        let mut inner = self.inner.lock();
        inner.retain(|_, entry| entry.expires_at > Instant::now());
        inner.insert(
            key.to_owned(),
            CacheEntry {
                record,
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), MatchCacheError> {
        self.inner.lock().remove(key);
        Ok(())
    }
}
