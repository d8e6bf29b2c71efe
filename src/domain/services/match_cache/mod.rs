use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::events::MatchRecord;

pub mod memory;

pub use self::memory::InMemoryMatchCache;

/// TTL applied to match records. A match that is neither accepted,
/// declined nor completed within this window simply expires.
pub const MATCH_TTL_SECS: u64 = 3600;

/// Cache key for the pending match of one delivery.
///
/// Keys are derived per delivery so that concurrent deliveries cannot
/// corrupt each other's match state.
pub fn match_key(delivery_id: Uuid) -> String {
    format!("match:{}", delivery_id)
}

/// Short-TTL key/value store holding pending match records.
///
/// The production collaborator is an external cache; implementations must
/// be safe for concurrent access from socket tasks and bus consumers.
#[async_trait]
pub trait MatchCache: Send + Sync {
    /// Returns the record stored under `key`, unless it has expired.
    async fn get(&self, key: &str) -> Result<Option<MatchRecord>, MatchCacheError>;

    /// Stores a record under `key` with the given TTL, replacing any
    /// existing record.
    async fn set(
        &self,
        key: &str,
        record: MatchRecord,
        ttl_secs: u64,
    ) -> Result<(), MatchCacheError>;

    /// Deletes the record under `key`, if any.
    async fn delete(&self, key: &str) -> Result<(), MatchCacheError>;
}

/// Errors that can occur during match cache operations.
#[derive(Debug, Error)]
pub enum MatchCacheError {
    /// The cache backend could not be reached.
    #[error("Cache backend error: {0}")]
    Backend(String),
}
