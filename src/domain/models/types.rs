//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types used throughout the dispatch engine:
// participants, riders, vehicles, deliveries, wallets, and the geospatial point
// type used by rider discovery.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Discrete value sets (DeliveryStatus, RiderStatus, VehicleKind).  |
// | STRUCTS            | Deliveries, riders, vehicles, wallets, fee records.              |
// | TESTS              | Unit tests for transitions and geospatial math.                  |
//--------------------------------------------------------------------------------------------------
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identity of either a rider or a customer.
///
/// The connection registry is identity-space-shared: no type tag
/// distinguishes the two roles, so uniqueness across them is an invariant
/// callers must preserve.
pub type ParticipantId = Uuid;

/// Status of a delivery as it moves through the dispatch pipeline.
///
/// Assignment is implicit: a `Pending` delivery with a rider set is what
/// the rest of the system treats as "assigned".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Submitted, not yet picked up by a rider.
    Pending,
    /// The rider has started the trip.
    OnTransit,
    /// The package reached the recipient; terminal.
    Delivered,
    /// Abandoned before completion; terminal.
    Canceled,
}

impl DeliveryStatus {
    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Transitions only move forward along
    /// `Pending -> OnTransit -> Delivered`; cancellation is allowed from
    /// any non-terminal state. No transition skips the prior stage.
    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        matches!(
            (self, next),
            (DeliveryStatus::Pending, DeliveryStatus::OnTransit)
                | (DeliveryStatus::OnTransit, DeliveryStatus::Delivered)
                | (DeliveryStatus::Pending, DeliveryStatus::Canceled)
                | (DeliveryStatus::OnTransit, DeliveryStatus::Canceled)
        )
    }
}

/// Whether a rider is reachable for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiderStatus {
    Online,
    Offline,
}

/// Vehicle category, used to look up an assumed cruising speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    Bike,
    Car,
    Bus,
    Other,
}

impl VehicleKind {
    /// Assumed cruising speed in km/h for arrival-time estimation.
    pub fn cruising_speed_kmh(&self) -> f64 {
        match self {
            VehicleKind::Bike => 15.0,
            VehicleKind::Car => 40.0,
            VehicleKind::Bus => 30.0,
            VehicleKind::Other => 10.0,
        }
    }
}

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// A delivery as persisted by the persistence collaborator.
///
/// The dispatch core only reads and updates specific fields (`status`,
/// `rider`); everything else is owned by the surrounding application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub customer: ParticipantId,
    /// Assigned rider, if any. `None` while the delivery is unmatched.
    pub rider: Option<ParticipantId>,
    pub status: DeliveryStatus,
    pub delivery_fee: Decimal,
    /// Human-facing reference number; also the settlement idempotency key.
    pub delivery_ref: String,
    pub sender_name: String,
    pub sender_address: String,
    pub recipient_address: String,
    pub sender_location: GeoPoint,
    pub created_at: DateTime<Utc>,
}

/// A rider as persisted by the persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub id: ParticipantId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub gender: String,
    pub status: RiderStatus,
    /// Administrative flag; inactive riders are never dispatched to.
    pub active: bool,
    /// Set while the rider is carrying a delivery.
    pub busy: bool,
    pub vehicle: Uuid,
}

/// The last reported position of a rider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderLocation {
    pub rider: ParticipantId,
    pub position: GeoPoint,
    pub updated_at: DateTime<Utc>,
}

/// A registered vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub owner: ParticipantId,
    pub kind: VehicleKind,
    pub plate_number: String,
}

/// A rider's wallet, created lazily on the first completed delivery and
/// credited additively thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderWallet {
    pub rider: ParticipantId,
    pub balance: Decimal,
}

/// Append-only record of the platform's cut of one completed delivery.
/// Never mutated after creation; its existence for a `delivery_ref` marks
/// that delivery as settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminFeeRecord {
    pub delivery_ref: String,
    pub rider: ParticipantId,
    pub admin_fee: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A persisted notification, also used to mark a rider's availability
/// decision on a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub rider: ParticipantId,
    pub customer: ParticipantId,
    pub availability: bool,
    pub created_at: DateTime<Utc>,
}
