//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Wire-level payloads: bus messages (package requests, driver responses,
// assignments), the ephemeral match record held in the cache, and the duplex
// events exchanged with rider/customer clients.
//--------------------------------------------------------------------------------------------------
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{GeoPoint, ParticipantId, RiderStatus};

/// A delivery request as broadcast on the `package_request` exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRequest {
    pub delivery_id: Uuid,
    pub customer_id: ParticipantId,
    pub sender_name: String,
    pub sender_address: String,
    pub recipient_address: String,
    pub delivery_ref: String,
}

/// A package request enriched with the candidate rider, as broadcast on the
/// `assigned_package_requests` exchange. Informational fanout only; no
/// subscriber is guaranteed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedPackage {
    #[serde(flatten)]
    pub request: PackageRequest,
    pub assigned_to: ParticipantId,
}

/// A rider's decision on a request, as broadcast on `driver_responses`.
///
/// Carries the delivery id so the relay can address the per-delivery
/// match record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverResponse {
    pub delivery_id: Uuid,
    pub rider_id: ParticipantId,
    pub customer_id: ParticipantId,
    /// `true` accepts the request, `false` declines it.
    pub availability: bool,
    pub arrival_time: Option<DateTime<Utc>>,
}

/// Snapshot of the candidate rider taken at discovery time, stored in the
/// match record so later stages never re-query the rider entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderSnapshot {
    pub id: ParticipantId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub gender: String,
    pub status: RiderStatus,
    pub location: GeoPoint,
}

/// The ephemeral record describing which rider is currently being
/// considered for which delivery.
///
/// Created by rider discovery, read by the dispatch engine, response relay
/// and lifecycle controller, deleted when a rider declines or the delivery
/// completes. Keyed per delivery in the match cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub delivery_id: Uuid,
    pub rider_id: ParticipantId,
    pub customer_id: ParticipantId,
    pub sender_address: String,
    pub recipient_address: String,
    /// Estimated arrival in minutes, floored at 2.
    pub estimated_delivery_time: u64,
    pub delivery_ref: String,
    pub rider: RiderSnapshot,
}

/// Events emitted to a client over its duplex connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum OutboundEvent {
    /// A dispatch offer pushed to the candidate rider.
    Notification {
        title: String,
        body: String,
        sender_address: String,
        recipient_address: String,
        customer_id: ParticipantId,
    },
    /// The rider accepted; relayed to the customer.
    RiderResponse {
        rider_id: ParticipantId,
        arrival_time: Option<DateTime<Utc>>,
    },
    /// The rider declined; relayed to the customer.
    RiderDeclined { rider_id: ParticipantId },
    /// Trip started; pushed to the customer with match context.
    StartDeliveryNotification {
        delivery_id: Uuid,
        rider_id: ParticipantId,
        delivery_ref: String,
        estimated_delivery_time: u64,
    },
    /// Trip finished; pushed to the customer with match context.
    EndDeliveryNotification {
        delivery_id: Uuid,
        rider_id: ParticipantId,
        delivery_ref: String,
    },
    /// The rider reached the pickup point.
    RiderArrivalNotification { rider_id: ParticipantId },
    /// A duplicate submission was ignored; the original request is still
    /// being matched.
    RequestAlreadySent { delivery_id: Uuid },
}

/// Events arriving from a client over its duplex connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum InboundEvent {
    /// Rider identity announcement; registers the connection.
    RiderId { rider_id: ParticipantId },
    /// Customer identity announcement; registers the connection.
    CustomerId { customer_id: ParticipantId },
    /// A new delivery request from a customer.
    PackageRequest(PackageRequest),
    /// The rider's accept/decline decision for an offered delivery.
    DriverResponse(DriverResponse),
    /// The rider reached the pickup point.
    Arrived { customer_id: ParticipantId },
    /// The rider started the trip.
    StartDelivery { delivery_id: Uuid },
    /// The rider completed the trip.
    EndDelivery { delivery_id: Uuid },
    /// Client acknowledged a dispatch offer.
    NotificationAck,
    /// Client acknowledged a rider-response relay.
    RiderResponseNotificationAck,
    /// The transport session ended.
    Disconnect,
}
