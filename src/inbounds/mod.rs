/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - session                                              |
/// |   - session_error                                        |
/// +----------------------------------------------------------+

/// Per-client duplex session handling.
pub mod session;

/// Error types for the session layer.
pub mod session_error;

pub use self::session::{Session, SessionHandler};
pub use self::session_error::SessionError;
