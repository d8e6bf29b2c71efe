use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::DeliveryStatus;
use crate::domain::services::match_cache::MatchCacheError;
use crate::outbounds::persistence::PersistenceError;

pub mod controller;
pub mod settlement;

pub use self::controller::LifecycleController;
pub use self::settlement::{Settlement, split_delivery_fee};

/// Errors that can occur while driving delivery transitions.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No match record exists for the delivery; the match expired or was
    /// never created.
    #[error("No match record for delivery {0}")]
    NoMatchRecord(Uuid),

    /// The delivery entity is missing from persistence.
    #[error("Delivery {0} not found")]
    DeliveryNotFound(Uuid),

    /// The requested transition skips or reverses a stage.
    #[error("Illegal delivery transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    /// A persistence call failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// A match cache call failed.
    #[error(transparent)]
    Cache(#[from] MatchCacheError),
}
