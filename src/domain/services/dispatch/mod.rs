use thiserror::Error;

use crate::domain::models::events::{AssignedPackage, PackageRequest};
use crate::domain::services::match_cache::MatchCacheError;

pub mod claims;
pub mod engine;

pub use self::claims::ClaimRegistry;
pub use self::engine::DispatchEngine;

/// Seam between the dispatch engine and the message bus.
///
/// Implementations must be non-blocking; publish failures past the seam
/// are fire-and-forget (logged by the transport, not surfaced here).
pub trait DispatchPublisher: Send + Sync {
    /// Broadcasts a new request on `package_request` with the given
    /// per-message TTL in milliseconds.
    fn publish_package_request(
        &self,
        request: &PackageRequest,
        ttl_ms: u64,
    ) -> Result<(), DispatchError>;

    /// Broadcasts a completed assignment on `assigned_package_requests`.
    /// Informational fanout, no TTL, no subscriber guaranteed.
    fn publish_assignment(&self, assigned: &AssignedPackage) -> Result<(), DispatchError>;
}

/// Errors that can occur during dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Handing a message to the bus failed.
    #[error("Failed to publish to {exchange}: {reason}")]
    Publish {
        exchange: &'static str,
        reason: String,
    },

    /// A payload could not be serialized for the bus.
    #[error("Failed to encode bus payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Reading the match cache failed.
    #[error(transparent)]
    Cache(#[from] MatchCacheError),
}
