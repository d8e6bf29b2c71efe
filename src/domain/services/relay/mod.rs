use thiserror::Error;

use crate::domain::models::events::DriverResponse;
use crate::domain::services::match_cache::MatchCacheError;
use crate::outbounds::persistence::PersistenceError;

pub mod relay;

pub use self::relay::ResponseRelay;

/// Seam between the relay and the `driver_responses` exchange - the
/// rider-side client publishes its decision through this.
pub trait ResponsePublisher: Send + Sync {
    fn publish_driver_response(&self, response: &DriverResponse) -> Result<(), RelayError>;
}

/// Errors that can occur while relaying driver responses.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Handing the response to the bus failed.
    #[error("Failed to publish to driver_responses: {0}")]
    Publish(String),

    /// A payload could not be serialized for the bus.
    #[error("Failed to encode bus payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Reading or clearing the match record failed.
    #[error(transparent)]
    Cache(#[from] MatchCacheError),

    /// A persistence call failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
