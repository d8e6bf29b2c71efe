//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Entity-scoped persistence traits. The surrounding web application owns the
// actual schema and CRUD surface; the dispatch core consumes only the
// narrow operations below. Absence is expressed as `Ok(None)` - services
// decide which absences are NotFound conditions.
//--------------------------------------------------------------------------------------------------

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::{
    AdminFeeRecord, Delivery, DeliveryStatus, GeoPoint, NotificationRecord, ParticipantId, Rider,
    RiderLocation, RiderWallet, Vehicle,
};

/// Errors raised by persistence collaborators.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing store could not be reached or rejected the call.
    #[error("Persistence backend error: {0}")]
    Backend(String),

    /// An update targeted an entity that does not exist.
    #[error("{entity} {id} not found")]
    MissingEntity { entity: &'static str, id: Uuid },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Store for delivery entities. The core reads deliveries and updates
/// only `rider` and `status`.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> PersistenceResult<Option<Delivery>>;

    /// The customer's most recent delivery; the source of the sender
    /// coordinates used by rider discovery.
    async fn latest_for_customer(
        &self,
        customer: ParticipantId,
    ) -> PersistenceResult<Option<Delivery>>;

    async fn create(&self, delivery: Delivery) -> PersistenceResult<()>;

    async fn set_rider(&self, id: Uuid, rider: ParticipantId) -> PersistenceResult<()>;

    async fn set_status(&self, id: Uuid, status: DeliveryStatus) -> PersistenceResult<()>;
}

/// Store for rider entities.
#[async_trait]
pub trait RiderStore: Send + Sync {
    async fn find_by_id(&self, id: ParticipantId) -> PersistenceResult<Option<Rider>>;

    async fn create(&self, rider: Rider) -> PersistenceResult<()>;

    async fn set_busy(&self, id: ParticipantId, busy: bool) -> PersistenceResult<()>;
}

/// Geospatial store of rider positions.
#[async_trait]
pub trait RiderLocationStore: Send + Sync {
    /// Riders within `max_radius_km` of `origin`, paired with their
    /// distance in kilometres, sorted ascending by distance.
    async fn find_near(
        &self,
        origin: GeoPoint,
        max_radius_km: f64,
    ) -> PersistenceResult<Vec<(RiderLocation, f64)>>;

    async fn upsert(&self, location: RiderLocation) -> PersistenceResult<()>;
}

/// Store for vehicle entities.
#[async_trait]
pub trait VehicleStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> PersistenceResult<Option<Vehicle>>;

    async fn create(&self, vehicle: Vehicle) -> PersistenceResult<()>;
}

/// Store for rider wallets.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn find_by_rider(&self, rider: ParticipantId)
    -> PersistenceResult<Option<RiderWallet>>;

    async fn create(&self, wallet: RiderWallet) -> PersistenceResult<()>;

    /// Adds `amount` to the rider's balance. The wallet must exist.
    async fn credit(&self, rider: ParticipantId, amount: Decimal) -> PersistenceResult<()>;
}

/// Append-only store of platform fee records.
#[async_trait]
pub trait AdminFeeStore: Send + Sync {
    /// The fee record for a delivery reference, if that delivery has
    /// already been settled.
    async fn find_by_ref(&self, delivery_ref: &str)
    -> PersistenceResult<Option<AdminFeeRecord>>;

    async fn append(&self, record: AdminFeeRecord) -> PersistenceResult<()>;
}

/// Store for persisted notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, notification: NotificationRecord) -> PersistenceResult<()>;
}
