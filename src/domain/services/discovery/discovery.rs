//--------------------------------------------------------------------------------------------------
// STRUCTS & FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                     | Description                                    | Key Methods       |
// |--------------------------|------------------------------------------------|-------------------|
// | RiderDiscovery           | Geospatial candidate selection + match record  | find_rider        |
// | estimate_arrival_minutes | ETA from distance and cruising speed           |                   |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::DiscoveryError;
use crate::domain::models::events::{MatchRecord, RiderSnapshot};
use crate::domain::models::types::{ParticipantId, RiderStatus, VehicleKind};
use crate::domain::services::match_cache::{MATCH_TTL_SECS, MatchCache, match_key};
use crate::outbounds::persistence::{
    DeliveryStore, RiderLocationStore, RiderStore, VehicleStore,
};

/// Minimum arrival estimate handed to customers, in minutes.
const MIN_ARRIVAL_MINUTES: u64 = 2;

/// Estimated arrival in whole minutes for a rider `distance_km` away
/// travelling at `speed_kmh`, floored at two minutes.
///
/// Computed from the selected candidate only. (An earlier iteration of the
/// system accumulated travel times across every nearby rider; that
/// aggregate had no consumer-facing meaning and is not reproduced here.)
pub fn estimate_arrival_minutes(distance_km: f64, speed_kmh: f64) -> u64 {
    let minutes = (distance_km / speed_kmh * 60.0).ceil() as u64;
    minutes.max(MIN_ARRIVAL_MINUTES)
}

/// Finds the nearest eligible rider for a customer's pending delivery and
/// records the candidate as the delivery's match record.
pub struct RiderDiscovery {
    deliveries: Arc<dyn DeliveryStore>,
    riders: Arc<dyn RiderStore>,
    locations: Arc<dyn RiderLocationStore>,
    vehicles: Arc<dyn VehicleStore>,
    cache: Arc<dyn MatchCache>,
    max_radius_km: f64,
}

impl RiderDiscovery {
    pub fn new(
        deliveries: Arc<dyn DeliveryStore>,
        riders: Arc<dyn RiderStore>,
        locations: Arc<dyn RiderLocationStore>,
        vehicles: Arc<dyn VehicleStore>,
        cache: Arc<dyn MatchCache>,
        max_radius_km: f64,
    ) -> Self {
        Self {
            deliveries,
            riders,
            locations,
            vehicles,
            cache,
            max_radius_km,
        }
    }

    /// Selects a candidate rider for the customer's most recent delivery.
    ///
    /// # Flow
    ///
    /// 1. Locates the customer's latest delivery and its sender coordinates
    /// 2. Radius-queries rider locations, ascending by distance
    /// 3. Takes the first candidate that is online and active
    /// 4. Resolves the candidate's vehicle for a cruising speed and
    ///    estimates arrival from the candidate's own distance
    /// 5. Writes the match record under the delivery's cache key (TTL 1 h)
    ///
    /// # Errors
    /// `NoDeliveryHistory`, `NoRidersNearby` or `NoEligibleRider` when any
    /// selection step comes up empty; persistence/cache errors otherwise.
    pub async fn find_rider(
        &self,
        customer_id: ParticipantId,
    ) -> Result<MatchRecord, DiscoveryError> {
        let delivery = self
            .deliveries
            .latest_for_customer(customer_id)
            .await?
            .ok_or(DiscoveryError::NoDeliveryHistory(customer_id))?;

        let nearby = self
            .locations
            .find_near(delivery.sender_location, self.max_radius_km)
            .await?;
        if nearby.is_empty() {
            return Err(DiscoveryError::NoRidersNearby {
                radius_km: self.max_radius_km,
            });
        }
        debug!(
            "found {} rider locations within {} km of delivery {}",
            nearby.len(),
            self.max_radius_km,
            delivery.id
        );

        // Scan ascending by distance for the first online, active rider.
        let mut candidate = None;
        for (location, distance_km) in &nearby {
            match self.riders.find_by_id(location.rider).await? {
                Some(rider) if rider.status == RiderStatus::Online && rider.active => {
                    candidate = Some((rider, location.clone(), *distance_km));
                    break;
                }
                Some(rider) => {
                    debug!(
                        "skipping rider {} at {:.2} km (status {:?}, active {})",
                        rider.id, distance_km, rider.status, rider.active
                    );
                }
                None => {
                    warn!("rider location {} has no rider entity", location.rider);
                }
            }
        }
        let (rider, location, distance_km) =
            candidate.ok_or(DiscoveryError::NoEligibleRider)?;

        let speed_kmh = match self.vehicles.find_by_id(rider.vehicle).await? {
            Some(vehicle) => vehicle.kind.cruising_speed_kmh(),
            None => {
                warn!("rider {} has no vehicle entity, assuming default speed", rider.id);
                VehicleKind::Other.cruising_speed_kmh()
            }
        };
        let estimated_delivery_time = estimate_arrival_minutes(distance_km, speed_kmh);

        let record = MatchRecord {
            delivery_id: delivery.id,
            rider_id: rider.id,
            customer_id,
            sender_address: delivery.sender_address.clone(),
            recipient_address: delivery.recipient_address.clone(),
            estimated_delivery_time,
            delivery_ref: delivery.delivery_ref.clone(),
            rider: RiderSnapshot {
                id: rider.id,
                name: rider.name.clone(),
                phone: rider.phone.clone(),
                email: rider.email.clone(),
                gender: rider.gender.clone(),
                status: rider.status,
                location: location.position,
            },
        };

        self.cache
            .set(&match_key(delivery.id), record.clone(), MATCH_TTL_SECS)
            .await?;

        info!(
            "matched rider {} ({:.2} km away, eta {} min) to delivery {}",
            rider.id, distance_km, estimated_delivery_time, delivery.id
        );

        Ok(record)
    }
}
