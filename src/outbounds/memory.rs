//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                 | Description                                     | Key Methods          |
// |----------------------|-------------------------------------------------|----------------------|
// | InMemoryPersistence  | Implements every store trait over HashMaps      | (per-trait methods)  |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::persistence::{
    AdminFeeStore, DeliveryStore, NotificationStore, PersistenceError, PersistenceResult,
    RiderLocationStore, RiderStore, VehicleStore, WalletStore,
};
use crate::domain::models::types::{
    AdminFeeRecord, Delivery, DeliveryStatus, GeoPoint, NotificationRecord, ParticipantId, Rider,
    RiderLocation, RiderWallet, Vehicle,
};

/// In-memory implementation of all persistence traits.
///
/// Backs the integration tests and the single-process demo daemon. One
/// instance implements every store trait; clone `Arc<InMemoryPersistence>`
/// and coerce per trait when wiring services.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    deliveries: RwLock<HashMap<Uuid, Delivery>>,
    riders: RwLock<HashMap<ParticipantId, Rider>>,
    locations: RwLock<HashMap<ParticipantId, RiderLocation>>,
    vehicles: RwLock<HashMap<Uuid, Vehicle>>,
    wallets: RwLock<HashMap<ParticipantId, RiderWallet>>,
    admin_fees: RwLock<Vec<AdminFeeRecord>>,
    notifications: RwLock<Vec<NotificationRecord>>,
}

impl InMemoryPersistence {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Test helper: all admin fee records appended so far.
    pub fn admin_fee_records(&self) -> Vec<AdminFeeRecord> {
        self.admin_fees.read().clone()
    }

    /// Test helper: all notification records created so far.
    pub fn notification_records(&self) -> Vec<NotificationRecord> {
        self.notifications.read().clone()
    }
}

#[async_trait]
impl DeliveryStore for InMemoryPersistence {
    async fn find_by_id(&self, id: Uuid) -> PersistenceResult<Option<Delivery>> {
        Ok(self.deliveries.read().get(&id).cloned())
    }

    async fn latest_for_customer(
        &self,
        customer: ParticipantId,
    ) -> PersistenceResult<Option<Delivery>> {
        Ok(self
            .deliveries
            .read()
            .values()
            .filter(|d| d.customer == customer)
            .max_by_key(|d| d.created_at)
            .cloned())
    }

    async fn create(&self, delivery: Delivery) -> PersistenceResult<()> {
        self.deliveries.write().insert(delivery.id, delivery);
        Ok(())
    }

    async fn set_rider(&self, id: Uuid, rider: ParticipantId) -> PersistenceResult<()> {
        let mut deliveries = self.deliveries.write();
        let delivery = deliveries
            .get_mut(&id)
            .ok_or(PersistenceError::MissingEntity {
                entity: "delivery",
                id,
            })?;
        delivery.rider = Some(rider);
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: DeliveryStatus) -> PersistenceResult<()> {
        let mut deliveries = self.deliveries.write();
        let delivery = deliveries
            .get_mut(&id)
            .ok_or(PersistenceError::MissingEntity {
                entity: "delivery",
                id,
            })?;
        delivery.status = status;
        Ok(())
    }
}

#[async_trait]
impl RiderStore for InMemoryPersistence {
    async fn find_by_id(&self, id: ParticipantId) -> PersistenceResult<Option<Rider>> {
        Ok(self.riders.read().get(&id).cloned())
    }

    async fn create(&self, rider: Rider) -> PersistenceResult<()> {
        self.riders.write().insert(rider.id, rider);
        Ok(())
    }

    async fn set_busy(&self, id: ParticipantId, busy: bool) -> PersistenceResult<()> {
        let mut riders = self.riders.write();
        let rider = riders.get_mut(&id).ok_or(PersistenceError::MissingEntity {
            entity: "rider",
            id,
        })?;
        rider.busy = busy;
        Ok(())
    }
}

#[async_trait]
impl RiderLocationStore for InMemoryPersistence {
    async fn find_near(
        &self,
        origin: GeoPoint,
        max_radius_km: f64,
    ) -> PersistenceResult<Vec<(RiderLocation, f64)>> {
        let mut nearby: Vec<(RiderLocation, f64)> = self
            .locations
            .read()
            .values()
            .map(|loc| (loc.clone(), origin.distance_km(&loc.position)))
            .filter(|(_, distance)| *distance <= max_radius_km)
            .collect();

        nearby.sort_by(|(_, a), (_, b)| a.total_cmp(b));
        Ok(nearby)
    }

    async fn upsert(&self, location: RiderLocation) -> PersistenceResult<()> {
        self.locations.write().insert(location.rider, location);
        Ok(())
    }
}

#[async_trait]
impl VehicleStore for InMemoryPersistence {
    async fn find_by_id(&self, id: Uuid) -> PersistenceResult<Option<Vehicle>> {
        Ok(self.vehicles.read().get(&id).cloned())
    }

    async fn create(&self, vehicle: Vehicle) -> PersistenceResult<()> {
        self.vehicles.write().insert(vehicle.id, vehicle);
        Ok(())
    }
}

#[async_trait]
impl WalletStore for InMemoryPersistence {
    async fn find_by_rider(
        &self,
        rider: ParticipantId,
    ) -> PersistenceResult<Option<RiderWallet>> {
        Ok(self.wallets.read().get(&rider).cloned())
    }

    async fn create(&self, wallet: RiderWallet) -> PersistenceResult<()> {
        self.wallets.write().insert(wallet.rider, wallet);
        Ok(())
    }

    async fn credit(&self, rider: ParticipantId, amount: Decimal) -> PersistenceResult<()> {
        let mut wallets = self.wallets.write();
        let wallet = wallets
            .get_mut(&rider)
            .ok_or(PersistenceError::MissingEntity {
                entity: "rider wallet",
                id: rider,
            })?;
        wallet.balance += amount;
        Ok(())
    }
}

#[async_trait]
impl AdminFeeStore for InMemoryPersistence {
    async fn find_by_ref(
        &self,
        delivery_ref: &str,
    ) -> PersistenceResult<Option<AdminFeeRecord>> {
        Ok(self
            .admin_fees
            .read()
            .iter()
            .find(|record| record.delivery_ref == delivery_ref)
            .cloned())
    }

    async fn append(&self, record: AdminFeeRecord) -> PersistenceResult<()> {
        self.admin_fees.write().push(record);
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for InMemoryPersistence {
    async fn create(&self, notification: NotificationRecord) -> PersistenceResult<()> {
        self.notifications.write().push(notification);
        Ok(())
    }
}
