use thiserror::Error;

use crate::domain::services::discovery::DiscoveryError;
use crate::domain::services::dispatch::DispatchError;
use crate::domain::services::lifecycle::LifecycleError;
use crate::domain::services::relay::RelayError;

/// +----------------------------------------------------------+
/// | STRUCTS | TRAITS | ENUMS | FUNCTIONS                     |
/// +----------+-------+-------+------------------------------+
/// | Enums:                                                   |
/// |   - SessionError                                         |
/// +----------------------------------------------------------+

/// Represents errors that can occur while handling a client session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The client sent an event that requires a prior identity
    /// announcement.
    #[error("Session has not announced an identity")]
    NotIdentified,

    /// A client frame could not be decoded.
    #[error("Malformed client frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// Rider discovery failed on infrastructure, not on absence.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Dispatch rejected the request.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Relaying the driver response failed.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// A lifecycle transition failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// An unexpected internal error occurred.
    #[error("Internal session error: {0}")]
    Internal(#[from] anyhow::Error),
}
