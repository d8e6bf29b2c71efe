//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module contains the connection registry, which maps participant
// identities (riders and customers share one identity space) to their live
// duplex connections.
//--------------------------------------------------------------------------------------------------

pub mod registry;

pub use self::registry::{Connection, ConnectionRegistry};
