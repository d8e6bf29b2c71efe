use thiserror::Error;
use uuid::Uuid;

use crate::domain::services::match_cache::MatchCacheError;
use crate::outbounds::persistence::PersistenceError;

pub mod discovery;

pub use self::discovery::{RiderDiscovery, estimate_arrival_minutes};

/// Errors that can occur during rider discovery.
///
/// The first three are NotFound conditions surfaced to the synchronous
/// caller (a 404-class outcome at the edge); the rest are infrastructure
/// failures.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The customer has no delivery record to take sender coordinates from.
    #[error("No delivery found for customer {0}")]
    NoDeliveryHistory(Uuid),

    /// The radius query over rider locations returned nothing.
    #[error("No riders within {radius_km} km of the pickup point")]
    NoRidersNearby { radius_km: f64 },

    /// Riders were nearby, but none was online and active.
    #[error("No eligible rider near the pickup point")]
    NoEligibleRider,

    /// A persistence call failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Writing the match record failed.
    #[error(transparent)]
    Cache(#[from] MatchCacheError),
}

impl DiscoveryError {
    /// Whether this is a NotFound condition rather than an
    /// infrastructure failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DiscoveryError::NoDeliveryHistory(_)
                | DiscoveryError::NoRidersNearby { .. }
                | DiscoveryError::NoEligibleRider
        )
    }
}
