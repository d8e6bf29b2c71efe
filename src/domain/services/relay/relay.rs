//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name           | Description                                         | Key Methods            |
// |----------------|-----------------------------------------------------|------------------------|
// | ResponseRelay  | Consumes driver decisions, updates match state,     | handle_driver_response |
// |                | notifies the customer                               | send_driver_response   |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{RelayError, ResponsePublisher};
use crate::domain::models::events::{DriverResponse, OutboundEvent};
use crate::domain::models::types::NotificationRecord;
use crate::domain::services::connections::ConnectionRegistry;
use crate::domain::services::dispatch::ClaimRegistry;
use crate::domain::services::match_cache::{MatchCache, match_key};
use crate::outbounds::persistence::{DeliveryStore, NotificationStore};

/// Relays rider decisions from the `driver_responses` exchange to the
/// waiting customer and settles the match state either way.
pub struct ResponseRelay {
    connections: ConnectionRegistry,
    cache: Arc<dyn MatchCache>,
    deliveries: Arc<dyn DeliveryStore>,
    notifications: Arc<dyn NotificationStore>,
    claims: ClaimRegistry,
    publisher: Arc<dyn ResponsePublisher>,
}

impl ResponseRelay {
    pub fn new(
        connections: ConnectionRegistry,
        cache: Arc<dyn MatchCache>,
        deliveries: Arc<dyn DeliveryStore>,
        notifications: Arc<dyn NotificationStore>,
        claims: ClaimRegistry,
        publisher: Arc<dyn ResponsePublisher>,
    ) -> Self {
        Self {
            connections,
            cache,
            deliveries,
            notifications,
            claims,
            publisher,
        }
    }

    /// Publishes a rider's decision on `driver_responses`. Entry point for
    /// the rider-side client.
    pub fn send_driver_response(&self, response: &DriverResponse) -> Result<(), RelayError> {
        self.publisher.publish_driver_response(response)
    }

    /// Processes one driver response from the bus.
    ///
    /// Accepted: relay `riderResponse` to the customer, persist a
    /// notification record marking the rider's decision, and bind the
    /// rider to the delivery.
    ///
    /// Declined: relay `riderDeclined`, delete the match record and drop
    /// the dispatch claims, ending this match attempt. There is no
    /// automatic retry against the next-nearest rider; the customer
    /// re-submits.
    pub async fn handle_driver_response(
        &self,
        response: DriverResponse,
    ) -> Result<(), RelayError> {
        if response.availability {
            self.handle_accepted(response).await
        } else {
            self.handle_declined(response).await
        }
    }

    async fn handle_accepted(&self, response: DriverResponse) -> Result<(), RelayError> {
        self.connections.send(
            &response.customer_id,
            OutboundEvent::RiderResponse {
                rider_id: response.rider_id,
                arrival_time: response.arrival_time,
            },
        );

        self.notifications
            .create(NotificationRecord {
                id: Uuid::new_v4(),
                rider: response.rider_id,
                customer: response.customer_id,
                availability: true,
                created_at: Utc::now(),
            })
            .await?;

        match self.cache.get(&match_key(response.delivery_id)).await? {
            Some(record) => {
                self.deliveries
                    .set_rider(record.delivery_id, response.rider_id)
                    .await?;
                info!(
                    "rider {} accepted delivery {}",
                    response.rider_id, record.delivery_id
                );
            }
            None => {
                // The match may have expired between offer and answer.
                warn!(
                    "rider {} accepted delivery {} but no match record exists",
                    response.rider_id, response.delivery_id
                );
            }
        }

        Ok(())
    }

    async fn handle_declined(&self, response: DriverResponse) -> Result<(), RelayError> {
        self.connections.send(
            &response.customer_id,
            OutboundEvent::RiderDeclined {
                rider_id: response.rider_id,
            },
        );

        self.cache.delete(&match_key(response.delivery_id)).await?;
        self.claims.release(response.delivery_id);

        info!(
            "rider {} declined delivery {}, match attempt ended",
            response.rider_id, response.delivery_id
        );

        Ok(())
    }
}
