// Expose the modules
pub mod config;
pub mod domain;
pub mod inbounds;
pub mod outbounds;

// Re-export key types for easier usage
pub use domain::models::events::{
    AssignedPackage, DriverResponse, InboundEvent, MatchRecord, OutboundEvent, PackageRequest,
};
pub use domain::models::types::{Delivery, DeliveryStatus, GeoPoint, Rider, VehicleKind};
pub use domain::services::connections::{Connection, ConnectionRegistry};
pub use domain::services::discovery::{DiscoveryError, RiderDiscovery};
pub use domain::services::dispatch::{ClaimRegistry, DispatchEngine, DispatchError};
pub use domain::services::lifecycle::{LifecycleController, LifecycleError};
pub use domain::services::match_cache::{InMemoryMatchCache, MatchCache, MatchCacheError};
pub use domain::services::relay::{RelayError, ResponseRelay};
pub use inbounds::{Session, SessionError, SessionHandler};
